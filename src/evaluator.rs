//! Backend dispatcher - routes a password to the selected backend.

use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backends::{
    BackendError, JsSandboxBackend, JsSandboxConnector, NativeBackend, StrengthBackend,
    WebViewBackend, WebViewFactory,
};
use crate::calculator::PasswordStrengthCalculator;
use crate::result::PasswordStrengthResult;
use crate::script::ScriptTemplate;
use crate::strength::PasswordStrength;

/// Holds one backend per calculator and the current selection.
pub struct StrengthEvaluator {
    backends: [Option<Arc<dyn StrengthBackend>>; 3],
    selected: RwLock<PasswordStrengthCalculator>,
}

impl Default for StrengthEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl StrengthEvaluator {
    /// Native scorer installed, script backends left for the host to plug in.
    pub fn new() -> Self {
        Self::empty().with_backend(
            PasswordStrengthCalculator::Native,
            Arc::new(NativeBackend::new()),
        )
    }

    /// No backend installed at all.
    pub fn empty() -> Self {
        Self {
            backends: [None, None, None],
            selected: RwLock::new(PasswordStrengthCalculator::default()),
        }
    }

    pub fn with_backend(
        mut self,
        calculator: PasswordStrengthCalculator,
        backend: Arc<dyn StrengthBackend>,
    ) -> Self {
        self.backends[calculator.index()] = Some(backend);
        self
    }

    pub fn with_web_view<F: WebViewFactory>(self, factory: F, template: Arc<ScriptTemplate>) -> Self {
        self.with_backend(
            PasswordStrengthCalculator::WebView,
            Arc::new(WebViewBackend::new(factory, template)),
        )
    }

    pub fn with_js_sandbox<C: JsSandboxConnector>(
        self,
        connector: C,
        template: Arc<ScriptTemplate>,
    ) -> Self {
        self.with_backend(
            PasswordStrengthCalculator::JsEngine,
            Arc::new(JsSandboxBackend::new(connector, template)),
        )
    }

    pub fn selected(&self) -> PasswordStrengthCalculator {
        *self.selected.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the calculator used by subsequent evaluations.
    pub fn select(&self, calculator: PasswordStrengthCalculator) {
        *self.selected.write().unwrap_or_else(PoisonError::into_inner) = calculator;
    }

    /// Evaluates `password` with `calculator`.
    ///
    /// Blank input short-circuits to `TooGuessable` without touching any
    /// backend. Every backend failure degrades to
    /// [`PasswordStrength::FALLBACK`]; nothing is propagated to the caller.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn evaluate(
        &self,
        password: &SecretString,
        calculator: PasswordStrengthCalculator,
    ) -> PasswordStrengthResult {
        let started = Instant::now();

        if password.expose_secret().trim().is_empty() {
            return PasswordStrengthResult::new(PasswordStrength::TooGuessable, started.elapsed());
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("evaluating password with {} backend", calculator);

        let strength = match self.measure(password, calculator).await {
            Ok(strength) => strength,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("{} backend failed, using fallback score: {}", calculator, e);
                PasswordStrength::FALLBACK
            }
        };

        PasswordStrengthResult::new(strength, started.elapsed())
    }

    pub async fn evaluate_selected(&self, password: &SecretString) -> PasswordStrengthResult {
        self.evaluate(password, self.selected()).await
    }

    /// Like [`Self::evaluate`], but gives up with `None` once `token` fires.
    pub async fn evaluate_cancellable(
        &self,
        password: &SecretString,
        calculator: PasswordStrengthCalculator,
        token: CancellationToken,
    ) -> Option<PasswordStrengthResult> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("evaluation cancelled");
                None
            }
            result = self.evaluate(password, calculator) => Some(result),
        }
    }

    /// Async version that sends the evaluation result via channel.
    ///
    /// Nothing is sent if the evaluation is cancelled.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn evaluate_tx(
        &self,
        password: &SecretString,
        calculator: PasswordStrengthCalculator,
        token: CancellationToken,
        tx: mpsc::Sender<PasswordStrengthResult>,
    ) {
        let Some(result) = self.evaluate_cancellable(password, calculator, token).await else {
            return;
        };

        if let Err(e) = tx.send(result).await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to send password evaluation result: {}", e);
        }
    }

    /// Releases every backend's execution context. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        for backend in self.backends.iter().flatten() {
            backend.release().await;
        }
    }

    async fn measure(
        &self,
        password: &SecretString,
        calculator: PasswordStrengthCalculator,
    ) -> Result<PasswordStrength, BackendError> {
        let backend = self.backends[calculator.index()]
            .as_ref()
            .ok_or(BackendError::Unavailable(calculator))?;
        backend.measure(password).await
    }
}

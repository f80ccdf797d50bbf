//! WebView backend - delegated script run in an embedded browser view.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use super::{BackendError, LazyContext, StrengthBackend};
use crate::script::ScriptTemplate;
use crate::strength::PasswordStrength;

/// An embedded browser view able to run scripts, provided by the host.
#[async_trait]
pub trait WebView: Send + Sync + 'static {
    /// Runs `script` and returns its completion value, JSON-encoded as
    /// browser script evaluators report it (e.g. `"3"` or `3`).
    async fn evaluate_javascript(&self, script: &str) -> Result<String, BackendError>;

    async fn destroy(&self) {}
}

/// Creates the browser view on first use.
#[async_trait]
pub trait WebViewFactory: Send + Sync + 'static {
    type View: WebView;

    async fn create(&self) -> Result<Self::View, BackendError>;
}

pub struct WebViewBackend<F: WebViewFactory> {
    factory: F,
    view: LazyContext<F::View>,
    template: Arc<ScriptTemplate>,
}

impl<F: WebViewFactory> WebViewBackend<F> {
    pub fn new(factory: F, template: Arc<ScriptTemplate>) -> Self {
        Self {
            factory,
            view: LazyContext::new(),
            template,
        }
    }

    pub async fn is_view_created(&self) -> bool {
        self.view.is_acquired().await
    }
}

#[async_trait]
impl<F: WebViewFactory> StrengthBackend for WebViewBackend<F> {
    async fn measure(&self, password: &SecretString) -> Result<PasswordStrength, BackendError> {
        let script = self.template.render(password)?;
        let view = self
            .view
            .get_or_try_init(|| async {
                #[cfg(feature = "tracing")]
                tracing::info!("creating web view for script evaluation");
                self.factory.create().await
            })
            .await?;

        let output = view.evaluate_javascript(&script).await?;
        Ok(output.replace('"', "").parse::<PasswordStrength>()?)
    }

    async fn release(&self) {
        if let Some(view) = self.view.take().await {
            #[cfg(feature = "tracing")]
            tracing::info!("destroying web view");
            view.destroy().await;
        }
    }
}

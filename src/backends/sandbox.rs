//! JavaScript sandbox backend - delegated script run in an isolate.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

use super::{BackendError, LazyContext, StrengthBackend};
use crate::script::ScriptTemplate;
use crate::strength::PasswordStrength;

/// A single script isolate. Dropped after one evaluation.
#[async_trait]
pub trait JsIsolate: Send + Sync {
    /// Runs `script` and returns its completion value as plain text.
    async fn evaluate_javascript(&self, script: &str) -> Result<String, BackendError>;
}

/// A connected sandbox process hosting isolates.
#[async_trait]
pub trait JsSandbox: Send + Sync + 'static {
    type Isolate: JsIsolate;

    async fn create_isolate(&self) -> Result<Self::Isolate, BackendError>;

    async fn close(&self);
}

/// Connects to the sandbox service. Invoked on first use only.
#[async_trait]
pub trait JsSandboxConnector: Send + Sync + 'static {
    type Sandbox: JsSandbox;

    async fn connect(&self) -> Result<Self::Sandbox, BackendError>;
}

pub struct JsSandboxBackend<C: JsSandboxConnector> {
    connector: C,
    sandbox: LazyContext<C::Sandbox>,
    template: Arc<ScriptTemplate>,
}

impl<C: JsSandboxConnector> JsSandboxBackend<C> {
    pub fn new(connector: C, template: Arc<ScriptTemplate>) -> Self {
        Self {
            connector,
            sandbox: LazyContext::new(),
            template,
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.sandbox.is_acquired().await
    }
}

#[async_trait]
impl<C: JsSandboxConnector> StrengthBackend for JsSandboxBackend<C> {
    async fn measure(&self, password: &SecretString) -> Result<PasswordStrength, BackendError> {
        let script = self.template.render(password)?;
        let sandbox = self
            .sandbox
            .get_or_try_init(|| async {
                #[cfg(feature = "tracing")]
                tracing::info!("connecting to JavaScript sandbox");
                self.connector.connect().await
            })
            .await?;

        let isolate = sandbox.create_isolate().await?;
        let output = isolate.evaluate_javascript(&script).await?;
        Ok(output.parse::<PasswordStrength>()?)
    }

    async fn release(&self) {
        if let Some(sandbox) = self.sandbox.take().await {
            #[cfg(feature = "tracing")]
            tracing::info!("closing JavaScript sandbox");
            sandbox.close().await;
        }
    }
}

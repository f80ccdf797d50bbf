//! Strength backends
//!
//! Each backend delegates scoring to someone else's estimator and turns the
//! raw answer into a [`PasswordStrength`].

mod lazy;
mod native;
mod sandbox;
mod webview;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::calculator::PasswordStrengthCalculator;
use crate::script::ScriptError;
use crate::strength::{PasswordStrength, ScoreError};

pub(crate) use lazy::LazyContext;
pub use native::NativeBackend;
pub use sandbox::{JsIsolate, JsSandbox, JsSandboxBackend, JsSandboxConnector};
pub use webview::{WebView, WebViewBackend, WebViewFactory};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("No backend configured for {0}")]
    Unavailable(PasswordStrengthCalculator),
    #[error("Failed to acquire script context: {0}")]
    Context(String),
    #[error("Script evaluation failed: {0}")]
    Script(String),
    #[error(transparent)]
    Template(#[from] ScriptError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error("Native scorer failed: {0}")]
    Native(String),
}

/// One way of scoring a password.
#[async_trait]
pub trait StrengthBackend: Send + Sync {
    async fn measure(&self, password: &SecretString) -> Result<PasswordStrength, BackendError>;

    /// Releases any long-lived execution context held by the backend.
    ///
    /// Must be safe to call when nothing was ever acquired, and more than once.
    async fn release(&self) {}
}

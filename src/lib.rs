//! Live password strength rating
//!
//! This library rates a password while it is being typed, using one of three
//! interchangeable backends:
//!
//! - **Native**: the zxcvbn estimator, run on tokio's blocking pool
//! - **WebView**: a delegated scoring script run in a host-provided browser view
//! - **JSEngine**: the same script run in a host-provided sandboxed isolate
//!
//! Keystrokes are debounced, only the most recently requested evaluation is
//! ever shown, and every backend failure degrades to
//! [`PasswordStrength::VeryGuessable`].
//!
//! # Features
//!
//! - `tracing`: Enables logging via tracing crate
//!
//! # Environment Variables
//!
//! - `PWD_STRENGTH_SCRIPT_PATH`: Custom path to the scoring script
//!   (default: `./assets/zxcvbn-ts.js`)
//! - `PWD_STRENGTH_SCRIPT_PLACEHOLDER`: Password placeholder in the script
//!   (default: `$arg1`)
//! - `PWD_STRENGTH_DEBOUNCE_MS`: Quiet period before evaluating (default: `500`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pwd_strength_live::{StrengthConfig, StrengthEvaluator, StrengthSession};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = StrengthConfig::from_env().expect("Invalid configuration");
//!     let evaluator = Arc::new(StrengthEvaluator::new());
//!     let session = StrengthSession::spawn(evaluator, config.session);
//!
//!     session.set_password("correct horse battery staple").unwrap();
//!     tokio::time::sleep(config.session.debounce * 2).await;
//!
//!     let view = session.view();
//!     println!("{} ({})", view.timing_label, session.result().strength());
//!
//!     session.shutdown().await;
//! }
//! ```

// Internal modules
mod backends;
mod calculator;
mod config;
mod evaluator;
mod pipeline;
mod result;
mod script;
mod strength;
mod view;

// Public API
pub use backends::{
    BackendError, JsIsolate, JsSandbox, JsSandboxBackend, JsSandboxConnector, NativeBackend,
    StrengthBackend, WebView, WebViewBackend, WebViewFactory,
};
pub use calculator::{PasswordStrengthCalculator, UnknownCalculator};
pub use config::{ConfigError, SessionConfig, StrengthConfig};
pub use evaluator::StrengthEvaluator;
pub use pipeline::{RequestTracker, SessionClosed, SessionState, StrengthSession, Ticket};
pub use result::PasswordStrengthResult;
pub use script::{
    ScriptError, ScriptTemplate, get_script_path, get_script_template, init_script_template,
    init_script_template_from_path,
};
pub use strength::{PasswordStrength, ScoreError};
pub use view::{CalculatorOption, PasswordField, StrengthView, VisibilityIcon, render};

// Re-exported so hosts can implement backend traits without a direct dependency
pub use async_trait::async_trait;
pub use secrecy::SecretString;

//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::script::{ScriptError, ScriptTemplate, init_script_template_from_path};

pub const DEBOUNCE_ENV: &str = "PWD_STRENGTH_DEBOUNCE_MS";
pub const SCRIPT_PATH_ENV: &str = "PWD_STRENGTH_SCRIPT_PATH";
pub const PLACEHOLDER_ENV: &str = "PWD_STRENGTH_SCRIPT_PLACEHOLDER";

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_SCRIPT_PATH: &str = "./assets/zxcvbn-ts.js";
pub const DEFAULT_PLACEHOLDER: &str = "$arg1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PWD_STRENGTH_DEBOUNCE_MS must be a positive number of milliseconds, got {0:?}")]
    InvalidDebounce(String),
    #[error("PWD_STRENGTH_SCRIPT_PLACEHOLDER must not be blank")]
    EmptyPlaceholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet period after the last keystroke before an evaluation starts.
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthConfig {
    pub session: SessionConfig,
    pub script_path: PathBuf,
    pub placeholder: String,
}

impl Default for StrengthConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            script_path: PathBuf::from(DEFAULT_SCRIPT_PATH),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl StrengthConfig {
    /// Builds the configuration from environment variables.
    ///
    /// Unset variables keep their defaults:
    /// - `PWD_STRENGTH_DEBOUNCE_MS`: `500`
    /// - `PWD_STRENGTH_SCRIPT_PATH`: `./assets/zxcvbn-ts.js`
    /// - `PWD_STRENGTH_SCRIPT_PLACEHOLDER`: `$arg1`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(DEBOUNCE_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidDebounce(raw.clone()))?;
            if millis == 0 {
                return Err(ConfigError::InvalidDebounce(raw));
            }
            config.session.debounce = Duration::from_millis(millis);
        }

        if let Ok(path) = std::env::var(SCRIPT_PATH_ENV) {
            config.script_path = PathBuf::from(path);
        }

        if let Ok(placeholder) = std::env::var(PLACEHOLDER_ENV) {
            if placeholder.trim().is_empty() {
                return Err(ConfigError::EmptyPlaceholder);
            }
            config.placeholder = placeholder;
        }

        Ok(config)
    }

    /// Loads (or returns the already cached) process-wide script template.
    pub fn load_script_template(&self) -> Result<Arc<ScriptTemplate>, ScriptError> {
        init_script_template_from_path(&self.script_path, &self.placeholder)
    }
}

//! Backend selection.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown strength calculator: {0}")]
pub struct UnknownCalculator(pub String);

/// The three interchangeable ways of computing a strength score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PasswordStrengthCalculator {
    /// Native zxcvbn scorer.
    #[default]
    Native,
    /// Delegated script evaluated in an embedded browser view.
    WebView,
    /// Delegated script evaluated in a sandboxed script isolate.
    JsEngine,
}

impl PasswordStrengthCalculator {
    /// Selector order.
    pub const ALL: [PasswordStrengthCalculator; 3] = [
        PasswordStrengthCalculator::Native,
        PasswordStrengthCalculator::WebView,
        PasswordStrengthCalculator::JsEngine,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PasswordStrengthCalculator::Native => "Native",
            PasswordStrengthCalculator::WebView => "WebView",
            PasswordStrengthCalculator::JsEngine => "JSEngine",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PasswordStrengthCalculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PasswordStrengthCalculator {
    type Err = UnknownCalculator;

    /// Accepts the selector label or the snake-case name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(PasswordStrengthCalculator::Native),
            "webview" | "web_view" => Ok(PasswordStrengthCalculator::WebView),
            "jsengine" | "js_engine" => Ok(PasswordStrengthCalculator::JsEngine),
            _ => Err(UnknownCalculator(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_in_selector_order() {
        let labels: Vec<_> = PasswordStrengthCalculator::ALL
            .iter()
            .map(|c| c.label())
            .collect();
        assert_eq!(labels, vec!["Native", "WebView", "JSEngine"]);
    }

    #[test]
    fn test_parse_label_and_name() {
        assert_eq!(
            "JSEngine".parse(),
            Ok(PasswordStrengthCalculator::JsEngine)
        );
        assert_eq!(
            "web_view".parse(),
            Ok(PasswordStrengthCalculator::WebView)
        );
        assert!("wasm".parse::<PasswordStrengthCalculator>().is_err());
    }

    #[test]
    fn test_default_is_native() {
        assert_eq!(
            PasswordStrengthCalculator::default(),
            PasswordStrengthCalculator::Native
        );
    }
}

//! Presentation state for the strength screen.
//!
//! [`render`] is a pure function of its inputs; the view keeps no state.

use secrecy::{ExposeSecret, SecretString};

use crate::calculator::PasswordStrengthCalculator;
use crate::result::PasswordStrengthResult;

pub const TITLE: &str = "Password Strength";
pub const FIELD_LABEL: &str = "Enter password";
pub const TOGGLE_DESCRIPTION: &str = "Toggle password visibility";
pub const MASK_CHAR: char = '\u{2022}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityIcon {
    /// Password shown in clear.
    Visible,
    /// Password masked.
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatorOption {
    pub calculator: PasswordStrengthCalculator,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub struct PasswordField {
    pub label: &'static str,
    pub text: String,
    pub icon: VisibilityIcon,
    pub toggle_description: &'static str,
}

// Keeps revealed passwords out of logs
impl std::fmt::Debug for PasswordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordField")
            .field("label", &self.label)
            .field("text", &"[REDACTED]")
            .field("icon", &self.icon)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrengthView {
    pub title: &'static str,
    pub calculators: Vec<CalculatorOption>,
    pub password_field: PasswordField,
    /// Strength bar fill, 0.0 to 1.0.
    pub progress: f32,
    pub timing_label: String,
}

pub fn render(
    password: &SecretString,
    show_password: bool,
    result: &PasswordStrengthResult,
    calculator: PasswordStrengthCalculator,
) -> StrengthView {
    let calculators = PasswordStrengthCalculator::ALL
        .into_iter()
        .map(|c| CalculatorOption {
            calculator: c,
            label: c.label(),
            selected: c == calculator,
        })
        .collect();

    let text = if show_password {
        password.expose_secret().to_string()
    } else {
        password.expose_secret().chars().map(|_| MASK_CHAR).collect()
    };

    StrengthView {
        title: TITLE,
        calculators,
        password_field: PasswordField {
            label: FIELD_LABEL,
            text,
            icon: if show_password {
                VisibilityIcon::Visible
            } else {
                VisibilityIcon::Hidden
            },
            toggle_description: TOGGLE_DESCRIPTION,
        },
        progress: result.strength().progress(),
        timing_label: format!("Calculation time: {} ms", result.calculation_time_millis()),
    }
}

use std::time::Duration;

use crate::strength::PasswordStrength;

/// Outcome of one completed evaluation.
///
/// Never mutated: the next evaluation produces a new value that replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordStrengthResult {
    strength: PasswordStrength,
    calculation_time: Duration,
}

impl PasswordStrengthResult {
    pub fn new(strength: PasswordStrength, calculation_time: Duration) -> Self {
        Self {
            strength,
            calculation_time,
        }
    }

    /// What is shown before anything has been evaluated.
    pub fn initial() -> Self {
        Self::new(PasswordStrength::TooGuessable, Duration::ZERO)
    }

    pub fn strength(&self) -> PasswordStrength {
        self.strength
    }

    pub fn calculation_time(&self) -> Duration {
        self.calculation_time
    }

    pub fn calculation_time_millis(&self) -> u128 {
        self.calculation_time.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_result() {
        let result = PasswordStrengthResult::initial();
        assert_eq!(result.strength(), PasswordStrength::TooGuessable);
        assert_eq!(result.calculation_time_millis(), 0);
    }

    #[test]
    fn test_millis_truncates_sub_millisecond_time() {
        let result = PasswordStrengthResult::new(
            PasswordStrength::SafelyUnguessable,
            Duration::from_micros(12_750),
        );
        assert_eq!(result.calculation_time_millis(), 12);
    }
}

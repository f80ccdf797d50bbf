//! Native backend - zxcvbn scoring on the blocking pool.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use zxcvbn::Score;

use super::{BackendError, StrengthBackend};
use crate::strength::PasswordStrength;

/// Scores passwords with the zxcvbn estimator.
///
/// The estimator is CPU-bound, so each measurement runs on tokio's blocking
/// pool and never stalls the event loop that feeds keystrokes in.
#[derive(Debug, Clone, Default)]
pub struct NativeBackend {
    user_inputs: Vec<String>,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra words (user name, e-mail parts) the estimator should penalize.
    pub fn with_user_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    /// Synchronous measurement: the zxcvbn score mapped onto the five levels.
    pub fn measure_blocking(&self, password: &str) -> PasswordStrength {
        let inputs: Vec<&str> = self.user_inputs.iter().map(String::as_str).collect();
        let entropy = zxcvbn::zxcvbn(password, &inputs);

        match entropy.score() {
            Score::One => PasswordStrength::VeryGuessable,
            Score::Two => PasswordStrength::SomewhatGuessable,
            Score::Three => PasswordStrength::SafelyUnguessable,
            Score::Four => PasswordStrength::VeryUnguessable,
            _ => PasswordStrength::TooGuessable,
        }
    }
}

#[async_trait]
impl StrengthBackend for NativeBackend {
    async fn measure(&self, password: &SecretString) -> Result<PasswordStrength, BackendError> {
        let scorer = self.clone();
        let password = SecretString::new(password.expose_secret().into());

        tokio::task::spawn_blocking(move || scorer.measure_blocking(password.expose_secret()))
            .await
            .map_err(|e| BackendError::Native(e.to_string()))
    }
}

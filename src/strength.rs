//! Five-level strength scale and score normalization.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Highest ordinal a backend may report.
pub const MAX_SCORE: u8 = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Score is not an integer: {0:?}")]
    Unparsable(String),
    #[error("Score {0} is outside 0..=4")]
    OutOfRange(i64),
}

/// Strength level reported to the user.
///
/// The ordinal matches the 0..=4 score produced by zxcvbn-style estimators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum PasswordStrength {
    #[default]
    TooGuessable = 0,
    VeryGuessable = 1,
    SomewhatGuessable = 2,
    SafelyUnguessable = 3,
    VeryUnguessable = 4,
}

impl PasswordStrength {
    pub const ALL: [PasswordStrength; 5] = [
        PasswordStrength::TooGuessable,
        PasswordStrength::VeryGuessable,
        PasswordStrength::SomewhatGuessable,
        PasswordStrength::SafelyUnguessable,
        PasswordStrength::VeryUnguessable,
    ];

    /// Level used whenever a backend output cannot be trusted.
    pub const FALLBACK: PasswordStrength = PasswordStrength::VeryGuessable;

    pub fn score(self) -> u8 {
        self as u8
    }

    /// Fill ratio of the strength bar, from 0.0 to 1.0.
    pub fn progress(self) -> f32 {
        f32::from(self.score()) / f32::from(MAX_SCORE)
    }

    /// Maps an integer score, falling back to [`Self::FALLBACK`] when out of range.
    pub fn from_score_or_default(score: i64) -> Self {
        Self::try_from(score).unwrap_or(Self::FALLBACK)
    }

    /// Parses raw textual backend output, falling back to [`Self::FALLBACK`].
    pub fn from_output_or_default(output: &str) -> Self {
        output.parse().unwrap_or(Self::FALLBACK)
    }
}

impl TryFrom<i64> for PasswordStrength {
    type Error = ScoreError;

    fn try_from(score: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|level| i64::from(level.score()) == score)
            .ok_or(ScoreError::OutOfRange(score))
    }
}

impl FromStr for PasswordStrength {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let score: i64 = s
            .trim()
            .parse()
            .map_err(|_| ScoreError::Unparsable(s.to_string()))?;
        Self::try_from(score)
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PasswordStrength::TooGuessable => "too guessable",
            PasswordStrength::VeryGuessable => "very guessable",
            PasswordStrength::SomewhatGuessable => "somewhat guessable",
            PasswordStrength::SafelyUnguessable => "safely unguessable",
            PasswordStrength::VeryUnguessable => "very unguessable",
        };
        f.write_str(label)
    }
}

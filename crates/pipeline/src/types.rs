//! Shared value types for the pipeline domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! values with invariants (a topic is never blank, limits are never zero) and
//! participate in execution decisions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PipelineError;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// The subject a pipeline run writes about.
///
/// Always trimmed and never empty. One run binds the same [`Topic`] verbatim
/// into every stage's templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    /// Parses raw user input into a topic.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidInput`] if the input is empty after trimming.
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidInput {
                reason: "topic must not be empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the topic text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Token accounting
// ---------------------------------------------------------------------------

/// Number of tokens consumed in an LLM API call.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenCount(u64);

impl TokenCount {
    /// Creates a [`TokenCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this count is zero.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for TokenCount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for TokenCount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

// ---------------------------------------------------------------------------

/// Prompt and completion tokens reported by a provider, accumulated per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens sent to the model.
    pub prompt: TokenCount,
    /// Tokens generated by the model.
    pub completion: TokenCount,
}

impl TokenUsage {
    /// Creates a usage record.
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt: TokenCount::new(prompt),
            completion: TokenCount::new(completion),
        }
    }

    /// Prompt plus completion tokens.
    pub fn total(self) -> TokenCount {
        self.prompt + self.completion
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt += rhs.prompt;
        self.completion += rhs.completion;
    }
}

// ---------------------------------------------------------------------------
// Resource limits
// ---------------------------------------------------------------------------

/// Budget an agent role may spend on a single invocation.
///
/// Every limit is optional; `None` means unlimited. Zero-valued limits are
/// rejected by the builder methods because they would make the role unable to
/// answer at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    max_iterations: Option<u32>,
    max_calls_per_minute: Option<u32>,
    max_execution_time: Option<Duration>,
}

impl ResourceLimits {
    /// Limits with nothing set.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Caps the number of provider calls (reasoning iterations) per invocation.
    ///
    /// A value of zero is ignored.
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = (max > 0).then_some(max);
        self
    }

    /// Caps provider calls inside any sliding one-minute window.
    ///
    /// A value of zero is ignored.
    #[must_use]
    pub fn with_max_calls_per_minute(mut self, max: u32) -> Self {
        self.max_calls_per_minute = (max > 0).then_some(max);
        self
    }

    /// Caps the wall-clock time of one invocation.
    ///
    /// A zero duration is ignored.
    #[must_use]
    pub fn with_max_execution_time(mut self, max: Duration) -> Self {
        self.max_execution_time = (!max.is_zero()).then_some(max);
        self
    }

    /// Maximum reasoning iterations, if capped.
    pub fn max_iterations(&self) -> Option<u32> {
        self.max_iterations
    }

    /// Maximum provider calls per minute, if capped.
    pub fn max_calls_per_minute(&self) -> Option<u32> {
        self.max_calls_per_minute
    }

    /// Maximum wall-clock time per invocation, if capped.
    pub fn max_execution_time(&self) -> Option<Duration> {
        self.max_execution_time
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

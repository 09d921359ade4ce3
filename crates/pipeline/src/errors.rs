//! Error and retry-policy types for the pipeline domain.
//!
//! Errors are layered the way failures travel:
//!
//! - [`ProviderError`], [`ToolError`] and [`ArtifactError`] are produced by
//!   infrastructure adapters behind the port traits.
//! - [`AgentError`] is what one agent-role invocation fails with.
//! - [`PipelineError`] is what a caller of the orchestrator sees. Stage-level
//!   failures never escape a stage as raw errors; they are recorded on the
//!   stage result and surface here as [`PipelineError::StageFailed`].
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error that participates in
//! retry decisions must be able to produce one.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ArtifactKey, StageName, ToolName};

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport failures, timeouts, rate-limit responses,
///   server errors, malformed model output.
/// - `NonRetryable` errors: bad credentials, invalid requests, exhausted
///   resource limits, failed artifact writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt (e.g. from a
        /// `Retry-After` header). `None` means apply the caller's schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Retryable with the caller's own back-off schedule.
    pub const RETRY: Self = Self::Retryable { after: None };

    /// Classifies an HTTP status code returned by a remote provider or tool.
    ///
    /// 408, 429 and 5xx are retryable; everything else is not.
    pub fn for_http_status(status: u16, retry_after: Option<Duration>) -> Self {
        match status {
            408 | 429 | 500..=599 => Self::Retryable { after: retry_after },
            _ => Self::NonRetryable,
        }
    }

    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Error kinds
// ---------------------------------------------------------------------------

/// The category of a failure, recorded on failed stage results and reported
/// on [`PipelineError::StageFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The caller supplied an empty or malformed topic.
    InvalidInput,
    /// Required configuration or credentials are missing.
    ConfigurationError,
    /// The language-model backend could not be reached or refused the call.
    CapabilityUnavailable,
    /// A tool call failed, or the model asked for a tool the role may not use.
    ToolInvocationError,
    /// The role exceeded its iteration, rate or wall-clock budget.
    ResourceLimitExceeded,
    /// The stage output did not satisfy its mechanical output contract.
    OutputContractViolation,
    /// The stage output could not be written to its persistence target.
    PersistenceError,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::InvalidInput => "InvalidInput",
            Self::ConfigurationError => "ConfigurationError",
            Self::CapabilityUnavailable => "CapabilityUnavailable",
            Self::ToolInvocationError => "ToolInvocationError",
            Self::ResourceLimitExceeded => "ResourceLimitExceeded",
            Self::OutputContractViolation => "OutputContractViolation",
            Self::PersistenceError => "PersistenceError",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Adapter errors
// ---------------------------------------------------------------------------

/// Failure of a [`crate::CapabilityProvider`] call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("capability provider unavailable: {message}")]
pub struct ProviderError {
    /// Human-readable description (transport error, HTTP status and body, …).
    pub message: String,
    /// Whether the orchestrator may retry the stage.
    pub retry: RetryPolicy,
}

impl ProviderError {
    /// A failure the orchestrator may retry.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: RetryPolicy::RETRY,
        }
    }

    /// A failure that will not go away on retry (bad credentials, bad request).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: RetryPolicy::NonRetryable,
        }
    }
}

/// Failure of a [`crate::Tool`] call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolError {
    /// Human-readable description.
    pub message: String,
    /// Whether the orchestrator may retry the stage.
    pub retry: RetryPolicy,
}

impl ToolError {
    /// A failure the orchestrator may retry.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: RetryPolicy::RETRY,
        }
    }

    /// A failure that will not go away on retry (missing argument, bad URL).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry: RetryPolicy::NonRetryable,
        }
    }
}

impl From<ProviderError> for ToolError {
    fn from(err: ProviderError) -> Self {
        Self {
            message: err.message,
            retry: err.retry,
        }
    }
}

/// Failure of an [`crate::ArtifactStore`] operation.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The store could not read, write or remove the artifact.
    #[error("artifact '{key}' I/O failure: {message}")]
    Io {
        /// Key of the artifact involved.
        key: ArtifactKey,
        /// Underlying error description.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Agent errors
// ---------------------------------------------------------------------------

/// Failure of a single agent-role invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The capability provider could not produce a response.
    #[error(transparent)]
    CapabilityUnavailable(#[from] ProviderError),

    /// A tool call failed, or the model requested a tool outside the role's
    /// permitted set.
    #[error("tool '{tool}' failed: {message}")]
    ToolInvocation {
        /// The tool the model asked for.
        tool: ToolName,
        /// Failure description.
        message: String,
        /// Whether the orchestrator may retry the stage.
        retry: RetryPolicy,
    },

    /// The role exceeded one of its configured resource limits.
    #[error("resource limit exceeded: {limit}")]
    ResourceLimitExceeded {
        /// Which limit was hit, in human-readable form.
        limit: String,
    },
}

impl AgentError {
    /// The error category recorded on the failed stage result.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Self::ToolInvocation { .. } => ErrorKind::ToolInvocationError,
            Self::ResourceLimitExceeded { .. } => ErrorKind::ResourceLimitExceeded,
        }
    }

    /// Whether the orchestrator may retry the stage that produced this error.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::CapabilityUnavailable(e) => e.retry,
            Self::ToolInvocation { retry, .. } => *retry,
            Self::ResourceLimitExceeded { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Wraps a tool failure with the name of the tool that produced it.
    pub fn tool(tool: ToolName, err: ToolError) -> Self {
        Self::ToolInvocation {
            tool,
            message: err.message,
            retry: err.retry,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors reported to the caller of a pipeline run.
///
/// A run either completes with every stage succeeded or fails with exactly one
/// of these; there is no partially successful outcome.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// The topic (or other caller input) was rejected before any stage ran.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected.
        reason: String,
    },

    /// Configuration or credentials are missing or malformed.
    ///
    /// Produced at start-up; the pipeline never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The pipeline definition violates a structural rule (duplicate stage
    /// names, forward dependencies, shared persistence targets, …).
    #[error("Invalid pipeline definition: {reason}")]
    InvalidDefinition {
        /// Description of the violated rule.
        reason: String,
    },

    /// A stage failed after exhausting its retry budget. Later stages did not
    /// run.
    #[error("Stage '{stage}' failed with {kind} after {attempts} attempt(s): {message}")]
    StageFailed {
        /// The stage that failed.
        stage: StageName,
        /// The category of the final failure.
        kind: ErrorKind,
        /// Description of the final failure.
        message: String,
        /// How many times the stage was executed.
        attempts: u32,
    },

    /// The artifact store failed outside of a stage (e.g. clearing stale
    /// artifacts before the first stage).
    #[error("Artifact store failure: {message}")]
    ArtifactStore {
        /// Description of the failure.
        message: String,
    },

    /// A run reported success but an artifact it must have written is absent.
    #[error("Artifact '{key}' missing after a successful run")]
    ArtifactMissing {
        /// The missing artifact key.
        key: ArtifactKey,
    },

    /// A run state transition was attempted that the state machine forbids.
    #[error("Invalid run state: {reason}")]
    InvalidState {
        /// Description of the rejected transition.
        reason: String,
    },
}

impl From<ArtifactError> for PipelineError {
    fn from(err: ArtifactError) -> Self {
        Self::ArtifactStore {
            message: err.to_string(),
        }
    }
}

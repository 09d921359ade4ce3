//! Core orchestration domain for InsightForge.
//!
//! This crate contains every domain concept of the sequential multi-agent
//! pipeline: identifiers, value types, errors, the declarative pipeline
//! definition, the run state machine, and the port traits infrastructure
//! crates implement. It never performs I/O itself.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** It defines *what* is needed;
//! `llm`, `tools` and `artifacts` define *how* to supply it, and `nodes`
//! drives execution.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`StageName`, `ToolName`, `ArtifactKey`, …) |
//! | [`types`] | Value types (`Topic`, `ResourceLimits`, `TokenUsage`, `Timestamp`) |
//! | [`errors`] | Error taxonomy and `RetryPolicy` |
//! | [`provider`] | `CapabilityProvider` port and its request/response types |
//! | [`tool`] | `Tool` port and the per-role `ToolSet` |
//! | [`artifact`] | `ArtifactStore` port |
//! | [`definition`] | `AgentRole`, `StageTask`, `PipelineDefinition` |
//! | [`conversation`] | Per-invocation `ConversationBuffer` |
//! | [`run`] | `StageResult`, `PipelineRun` state machine, `CompletedRun` |

pub mod artifact;
pub mod conversation;
pub mod definition;
pub mod errors;
pub mod identifiers;
pub mod provider;
pub mod run;
pub mod tool;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use artifact::ArtifactStore;
pub use conversation::ConversationBuffer;
pub use definition::{
    bind_template, AgentRole, OutputContract, PipelineDefinition, StageTask, CONTEXT_PLACEHOLDER,
    CONTEXT_SEPARATOR, TOPIC_PLACEHOLDER,
};
pub use errors::{
    AgentError, ArtifactError, ErrorKind, PipelineError, ProviderError, RetryPolicy, ToolError,
};
pub use identifiers::{ArtifactKey, PipelineName, PipelineRunId, RoleName, StageName, ToolName};
pub use provider::{
    CapabilityProvider, Generation, GenerationRequest, GenerationResponse, Message, ToolCall,
    ToolParameter, ToolSpec,
};
pub use run::{
    CompletedRun, PipelineRun, RunStatus, StageFailure, StageOutcome, StageResult, StageTrace,
};
pub use tool::{required_arg, Tool, ToolArgs, ToolSet};
pub use types::{ResourceLimits, Timestamp, TokenCount, TokenUsage, Topic};

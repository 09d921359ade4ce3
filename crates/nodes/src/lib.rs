//! InsightForge execution layer.
//!
//! This crate drives the domain defined in [`pipeline`]: it runs agent roles
//! against a capability provider, executes stage tasks, sequences and retries
//! them as a pipeline run, and supplies the default five-stage blog pipeline
//! together with the trigger that returns its published artifacts.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Executors sequence calls between the domain types
//! in [`pipeline`] and the infrastructure behind its port traits (LLM
//! provider, tools, artifact store). They hold no state between runs.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`agent`] | `AgentExecutor`: the tool-calling reasoning loop for one role |
//! | [`rate_limit`] | `CallRateLimiter`: per-minute call throttle |
//! | [`stage`] | `StageExecutor`: one stage execution → `StageResult` |
//! | [`retry`] | `RetryConfig`: stage retry schedule |
//! | [`executor`] | `PipelineExecutor`: the orchestrator |
//! | [`social`] | `SocialMediaKit` and its output contract |
//! | [`blog`] | The default research → write → SEO → edit → social pipeline |
//! | [`generate`] | `ContentGenerator`: topic in, post and social kit out |

pub mod agent;
pub mod blog;
pub mod executor;
pub mod generate;
pub mod rate_limit;
pub mod retry;
pub mod social;
pub mod stage;

pub use agent::{AgentExecutor, AgentOutput};
pub use blog::{blog_pipeline, BlogTools};
pub use executor::PipelineExecutor;
pub use generate::{ContentGenerator, GeneratedContent};
pub use rate_limit::CallRateLimiter;
pub use retry::RetryConfig;
pub use social::{Platform, PostingTime, SocialKitContract, SocialKitError, SocialMediaKit, SocialPost};
pub use stage::StageExecutor;

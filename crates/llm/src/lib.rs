//! InsightForge LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::CapabilityProvider`] trait for Google's Gemini
//! `generateContent` API. Additional providers are added as new modules in
//! this crate without any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response
//! parsing and retry classification of HTTP failures live here. The
//! [`pipeline`] crate sees only [`pipeline::CapabilityProvider`]; the
//! orchestrator decides whether and when to retry.

pub mod gemini;

pub use gemini::{GeminiConfig, GeminiProvider, GEMINI_API_BASE};

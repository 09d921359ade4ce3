//! Gemini provider.
//!
//! Speaks the REST `models/{model}:generateContent` endpoint directly over
//! `reqwest`: the role's system instruction, the upstream context, the
//! conversation turns and the permitted tool declarations go out in one
//! request; either final text or function calls come back.

mod client;
mod config;
mod convert;

pub use client::GeminiProvider;
pub use config::{GeminiConfig, GEMINI_API_BASE};

//! InsightForge CLI entry point.
//!
//! The composition root: loads `.env` and settings, installs the tracing
//! subscriber (with optional OTLP export), builds the Gemini provider, the
//! tools and the file artifact store, and hands them to the blog pipeline.
//!
//! ```text
//! insightforge generate --topic "The Rise of Open Source LLMs"
//! insightforge show --output-dir ./out
//! ```

mod commands;
mod config;
mod telemetry;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    commands::Cli::parse().run().await
}

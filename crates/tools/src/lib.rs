//! InsightForge tool adapters.
//!
//! Implements the [`pipeline::Tool`] trait for the capabilities agent roles
//! may be granted:
//!
//! | Tool | Backing |
//! |------|---------|
//! | `search_internet` | Serper Google search API |
//! | `scrape_website` | HTTP fetch + HTML-to-text |
//! | `seo_analysis`, `grammar_check`, `social_post_generator` | Prompted calls to a [`pipeline::CapabilityProvider`] |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Tools never retry on their own; each failure carries
//! a [`pipeline::RetryPolicy`] and the orchestrator decides.

mod http;
pub mod prompt;
pub mod scrape;
pub mod search;

pub use prompt::PromptTool;
pub use scrape::{ScrapeWebsiteTool, TextExtractor, MAX_SCRAPED_CHARS};
pub use search::{SerperConfig, SerperSearchTool, SERPER_API_BASE};

//! Google search through the Serper API.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{required_arg, Tool, ToolArgs, ToolError, ToolName, ToolParameter};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::http;

/// Default Serper API base URL.
pub const SERPER_API_BASE: &str = "https://google.serper.dev";

const TOOL_NAME: &str = "search_internet";
const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Clone)]
pub struct SerperConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    /// Organic results requested per query.
    pub num_results: u32,
    pub timeout: Duration,
}

impl SerperConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            num_results: 10,
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results.max(1);
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(SERPER_API_BASE);
        format!("{}/search", base.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for SerperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("num_results", &self.num_results)
            .finish()
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// The `search_internet` tool.
pub struct SerperSearchTool {
    name: ToolName,
    client: Client,
    config: SerperConfig,
}

impl SerperSearchTool {
    /// # Errors
    ///
    /// [`ToolError`] if the HTTP client cannot be built.
    pub fn new(config: SerperConfig) -> Result<Self, ToolError> {
        let name = ToolName::new(TOOL_NAME)
            .ok_or_else(|| ToolError::permanent("invalid tool name"))?;
        Ok(Self {
            name,
            client: http::client(config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl Tool for SerperSearchTool {
    fn name(&self) -> &ToolName {
        &self.name
    }

    fn description(&self) -> &str {
        "Search the internet with Google and return the top results with title, link and snippet."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("query", "The search query")]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let query = required_arg(args, "query")?;
        tracing::debug!(tool = TOOL_NAME, query, "Searching");

        let response = self
            .client
            .post(self.config.endpoint())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.config.num_results,
            })
            .send()
            .await
            .map_err(|e| http::transport_error("Serper", e))?;

        if !response.status().is_success() {
            return Err(http::status_error("Serper", response).await);
        }
        let results: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::transient(format!("malformed Serper response: {e}")))?;

        Ok(format_results(query, &results.organic))
    }
}

fn format_results(query: &str, results: &[OrganicResult]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.");
    }
    let mut out = String::from("Search results:\n");
    for result in results {
        let _ = write!(
            out,
            "Title: {}\nLink: {}\nSnippet: {}\n---\n",
            result.title, result.link, result.snippet
        );
    }
    out
}

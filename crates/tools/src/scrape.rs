//! Website fetch and plain-text extraction.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{required_arg, Tool, ToolArgs, ToolError, ToolName, ToolParameter};
use regex::Regex;
use reqwest::Client;

use crate::http;

/// Scraped text beyond this many characters is cut off.
pub const MAX_SCRAPED_CHARS: usize = 50_000;

const TOOL_NAME: &str = "scrape_website";
const TRUNCATION_MARKER: &str = "\n[content truncated]";

const ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

/// Reduces an HTML document to its readable text.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    hidden: Regex,
    comment: Regex,
    block: Regex,
    tag: Regex,
    spaces: Regex,
}

impl TextExtractor {
    /// # Errors
    ///
    /// [`regex::Error`] if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            hidden: Regex::new(
                r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<head\b.*?</head\s*>|<svg\b.*?</svg\s*>",
            )?,
            comment: Regex::new(r"(?s)<!--.*?-->")?,
            block: Regex::new(
                r"(?i)<\s*/?\s*(br|p|div|h[1-6]|li|ul|ol|tr|table|section|article|header|footer|blockquote|pre)\b[^>]*>",
            )?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            spaces: Regex::new(r"[ \t\u{a0}]+")?,
        })
    }

    /// Strips markup, hidden elements and comments; decodes common entities;
    /// keeps one line per block element.
    pub fn extract(&self, html: &str) -> String {
        let text = self.hidden.replace_all(html, " ");
        let text = self.comment.replace_all(&text, " ");
        let text = self.block.replace_all(&text, "\n");
        let text = self.tag.replace_all(&text, "");

        let mut decoded = text.into_owned();
        for (entity, replacement) in ENTITIES {
            decoded = decoded.replace(entity, replacement);
        }

        decoded
            .lines()
            .map(|line| self.spaces.replace_all(line.trim(), " ").into_owned())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The `scrape_website` tool.
pub struct ScrapeWebsiteTool {
    name: ToolName,
    client: Client,
    extractor: TextExtractor,
}

impl ScrapeWebsiteTool {
    /// # Errors
    ///
    /// [`ToolError`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ToolError> {
        let name = ToolName::new(TOOL_NAME)
            .ok_or_else(|| ToolError::permanent("invalid tool name"))?;
        let extractor = TextExtractor::new()
            .map_err(|e| ToolError::permanent(format!("invalid extraction pattern: {e}")))?;
        Ok(Self {
            name,
            client: http::client(timeout)?,
            extractor,
        })
    }
}

#[async_trait]
impl Tool for ScrapeWebsiteTool {
    fn name(&self) -> &ToolName {
        &self.name
    }

    fn description(&self) -> &str {
        "Read the readable text content of a web page."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "website_url",
            "Absolute http(s) URL of the page to read",
        )]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let url = required_arg(args, "website_url")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ToolError::permanent(format!(
                "'{url}' is not an http(s) URL"
            )));
        }
        tracing::debug!(tool = TOOL_NAME, url, "Scraping");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| http::transport_error("website", e))?;
        if !response.status().is_success() {
            return Err(http::status_error("website", response).await);
        }
        let html = response
            .text()
            .await
            .map_err(|e| ToolError::transient(format!("failed to read page body: {e}")))?;

        let text = self.extractor.extract(&html);
        if text.is_empty() {
            return Ok(format!("The page at {url} has no readable text."));
        }
        Ok(truncate(text))
    }
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_SCRAPED_CHARS) {
        Some((idx, _)) => {
            let mut cut = text[..idx].to_string();
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_visible_text() {
        let html = r#"<!DOCTYPE html>
            <html><head><title>Ignored</title><style>p { color: red; }</style></head>
            <body>
              <!-- nav -->
              <h1>Open   LLMs</h1>
              <script>var x = "<p>hidden</p>";</script>
              <p>Weights &amp; data are <b>open</b>.</p>
              <ul><li>One</li><li>Two&nbsp;items</li></ul>
            </body></html>"#;

        let text = TextExtractor::new().unwrap().extract(html);

        assert_eq!(text, "Open LLMs\nWeights & data are open.\nOne\nTwo items");
    }

    #[test]
    fn long_text_is_truncated() {
        let text = "x".repeat(MAX_SCRAPED_CHARS + 100);
        let cut = truncate(text);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        assert_eq!(cut.chars().count(), MAX_SCRAPED_CHARS + TRUNCATION_MARKER.chars().count());

        assert_eq!(truncate("short".to_string()), "short");
    }
}

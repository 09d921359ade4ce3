//! Gemini client implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pipeline::{
    CapabilityProvider, Generation, GenerationRequest, GenerationResponse, ProviderError,
    RetryPolicy,
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;

use super::config::GeminiConfig;
use super::convert::{self, GenerateContentResponse};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest slice of an error body kept in error messages.
const MAX_ERROR_BODY: usize = 500;

/// [`CapabilityProvider`] backed by the Gemini REST API.
///
/// # Example
///
/// ```rust,ignore
/// use llm::{GeminiConfig, GeminiProvider};
///
/// let provider = GeminiProvider::new(GeminiConfig::flash(std::env::var("GOOGLE_API_KEY")?))?;
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    label: String,
}

impl GeminiProvider {
    /// Creates a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// A non-retryable [`ProviderError`] if the HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::permanent(format!("failed to create HTTP client: {e}")))?;
        let label = format!("gemini/{}", config.model);
        Ok(Self {
            client,
            config,
            label,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl CapabilityProvider for GeminiProvider {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let body = convert::build_request(&request, self.config.temperature);
        let started = Instant::now();

        let response = self
            .client
            .post(self.config.endpoint())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_default();
            let retry = RetryPolicy::for_http_status(status.as_u16(), retry_after);
            tracing::warn!(
                model = %self.config.model,
                status = status.as_u16(),
                retryable = retry.is_retryable(),
                "Gemini API returned an error"
            );
            return Err(ProviderError {
                message: format!("Gemini API error ({status}): {}", truncate(&error_text)),
                retry,
            });
        }

        let wire: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::transient(format!("malformed Gemini response: {e}")))?;
        let parsed = convert::parse_response(wire)?;

        tracing::debug!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            prompt_tokens = parsed.usage.prompt.as_u64(),
            completion_tokens = parsed.usage.completion.as_u64(),
            tool_calls = match &parsed.output {
                Generation::ToolCalls(calls) => calls.len(),
                Generation::Text(_) => 0,
            },
            "Gemini call completed"
        );
        Ok(parsed)
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::permanent(format!("invalid Gemini request: {err}"))
    } else {
        ProviderError::transient(format!("Gemini request failed: {err}"))
    }
}

/// Reads a `Retry-After` header given in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

//! Shared HTTP plumbing for the network-backed tools.

use std::time::Duration;

use pipeline::{RetryPolicy, ToolError};
use reqwest::{Client, Response};

const MAX_ERROR_BODY: usize = 300;

pub(crate) fn client(timeout: Duration) -> Result<Client, ToolError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("insightforge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ToolError::permanent(format!("failed to create HTTP client: {e}")))
}

pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> ToolError {
    if err.is_builder() {
        ToolError::permanent(format!("invalid {service} request: {err}"))
    } else {
        ToolError::transient(format!("{service} request failed: {err}"))
    }
}

/// Turns a non-success response into a [`ToolError`] classified by status.
pub(crate) async fn status_error(service: &str, response: Response) -> ToolError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    ToolError {
        message: format!("{service} returned {status}: {body}"),
        retry: RetryPolicy::for_http_status(status.as_u16(), None),
    }
}

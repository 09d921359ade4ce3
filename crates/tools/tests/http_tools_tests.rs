use std::time::Duration;

use pipeline::{RetryPolicy, Tool, ToolArgs};
use serde_json::json;
use tools::{ScrapeWebsiteTool, SerperConfig, SerperSearchTool};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn args(name: &str, value: &str) -> ToolArgs {
    ToolArgs::from([(name.to_string(), value.to_string())])
}

fn search_tool(server: &MockServer) -> SerperSearchTool {
    let config = SerperConfig::new("serper-key")
        .with_base_url(server.uri())
        .with_num_results(5);
    SerperSearchTool::new(config).unwrap()
}

fn scrape_tool() -> ScrapeWebsiteTool {
    ScrapeWebsiteTool::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn search_posts_query_with_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("X-API-KEY", "serper-key"))
        .and(body_json(json!({ "q": "open source llms", "num": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic": [
                { "title": "Llama 3", "link": "https://example.com/llama", "snippet": "Open weights." },
                { "title": "Mistral", "link": "https://example.com/mistral", "snippet": "Small and fast." }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = search_tool(&server)
        .invoke(&args("query", "open source llms"))
        .await
        .unwrap();

    assert!(output.starts_with("Search results:\n"));
    assert!(output.contains("Title: Llama 3\nLink: https://example.com/llama\nSnippet: Open weights."));
    assert!(output.contains("Title: Mistral"));
}

#[tokio::test]
async fn search_without_results_says_so() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "searchParameters": {} })))
        .mount(&server)
        .await;

    let output = search_tool(&server).invoke(&args("query", "qqq")).await.unwrap();

    assert_eq!(output, "No results found for 'qqq'.");
}

#[tokio::test]
async fn search_rate_limit_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&server)
        .await;

    let err = search_tool(&server).invoke(&args("query", "x")).await.unwrap_err();

    assert!(err.retry.is_retryable());
    assert!(err.message.contains("Serper"));
}

#[tokio::test]
async fn search_rejected_key_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = search_tool(&server).invoke(&args("query", "x")).await.unwrap_err();

    assert_eq!(err.retry, RetryPolicy::NonRetryable);
    assert!(err.message.contains("Unauthorized"));
}

#[tokio::test]
async fn search_requires_query() {
    let server = MockServer::start().await;

    let err = search_tool(&server).invoke(&ToolArgs::new()).await.unwrap_err();

    assert_eq!(err.retry, RetryPolicy::NonRetryable);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn scrape_returns_page_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>t</title></head><body>\
             <h1>Open LLMs</h1><p>They are <em>everywhere</em> &amp; cheap.</p>\
             <script>track()</script></body></html>",
        ))
        .mount(&server)
        .await;

    let url = format!("{}/article", server.uri());
    let output = scrape_tool().invoke(&args("website_url", &url)).await.unwrap();

    assert_eq!(output, "Open LLMs\nThey are everywhere & cheap.");
}

#[tokio::test]
async fn scrape_missing_page_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let err = scrape_tool().invoke(&args("website_url", &url)).await.unwrap_err();

    assert_eq!(err.retry, RetryPolicy::NonRetryable);
    assert!(err.message.contains("404"));
}

#[tokio::test]
async fn scrape_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let url = format!("{}/flaky", server.uri());
    let err = scrape_tool().invoke(&args("website_url", &url)).await.unwrap_err();

    assert!(err.retry.is_retryable());
}

#[tokio::test]
async fn scrape_rejects_non_http_urls() {
    let err = scrape_tool()
        .invoke(&args("website_url", "file:///etc/passwd"))
        .await
        .unwrap_err();

    assert_eq!(err.retry, RetryPolicy::NonRetryable);
}

#[tokio::test]
async fn scrape_page_without_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body><script>x()</script></body></html>"))
        .mount(&server)
        .await;

    let url = format!("{}/blank", server.uri());
    let output = scrape_tool().invoke(&args("website_url", &url)).await.unwrap();

    assert_eq!(output, format!("The page at {url} has no readable text."));
}

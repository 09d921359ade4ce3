use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipeline::{
    CapabilityProvider, Generation, GenerationRequest, GenerationResponse, Message, ProviderError,
    RetryPolicy, Tool, ToolArgs, TokenUsage,
};
use tools::PromptTool;

/// Answers every prompt with a fixed reply, or fails, and keeps the prompts.
struct FakeProvider {
    reply: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing(err: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(err),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        for message in &request.messages {
            if let Message::User(prompt) = message {
                self.prompts.lock().unwrap().push(prompt.clone());
            }
        }
        let text = self.reply.clone()?;
        Ok(GenerationResponse {
            output: Generation::Text(text),
            usage: TokenUsage::default(),
        })
    }
}

fn text_arg(text: &str) -> ToolArgs {
    ToolArgs::from([("text".to_string(), text.to_string())])
}

#[tokio::test]
async fn seo_analysis_returns_model_answer() {
    let provider = FakeProvider::replying("Use 'open source LLM' as primary keyword.");
    let tool = PromptTool::seo_analysis(provider.clone()).unwrap();

    let output = tool.invoke(&text_arg("A post about models.")).await.unwrap();

    assert_eq!(output, "Use 'open source LLM' as primary keyword.");
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Analyze this text for SEO optimization:\nA post about models.\n"));
    assert!(prompts[0].contains("Meta description suggestion"));
}

#[tokio::test]
async fn grammar_check_declares_text_parameter() {
    let provider = FakeProvider::replying("Fixed.");
    let tool = PromptTool::grammar_check(provider.clone()).unwrap();

    let spec = tool.spec();
    assert_eq!(spec.name.as_str(), "grammar_check");
    assert_eq!(spec.parameters.len(), 1);
    assert_eq!(spec.parameters[0].name, "text");

    tool.invoke(&text_arg("Their going home.")).await.unwrap();
    assert!(provider.prompts()[0].contains("Their going home."));
}

#[tokio::test]
async fn social_post_generator_fills_platform() {
    let provider = FakeProvider::replying("New post! #AI");
    let tool = PromptTool::social_post_generator(provider.clone()).unwrap();
    let args = ToolArgs::from([
        ("text".to_string(), "Open models win.".to_string()),
        ("platform".to_string(), "Instagram".to_string()),
    ]);

    tool.invoke(&args).await.unwrap();

    assert!(provider.prompts()[0].starts_with("Create a Instagram post based on this content:"));
}

#[tokio::test]
async fn provider_failure_keeps_retry_policy() {
    let tool = PromptTool::grammar_check(FakeProvider::failing(ProviderError::transient("overloaded"))).unwrap();

    let err = tool.invoke(&text_arg("x")).await.unwrap_err();

    assert_eq!(err.retry, RetryPolicy::RETRY);
    assert!(err.message.contains("overloaded"));

    let tool = PromptTool::grammar_check(FakeProvider::failing(ProviderError::permanent("bad key"))).unwrap();
    let err = tool.invoke(&text_arg("x")).await.unwrap_err();
    assert_eq!(err.retry, RetryPolicy::NonRetryable);
}

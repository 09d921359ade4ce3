//! Port trait for the language-model backend.
//!
//! A [`CapabilityProvider`] turns a [`GenerationRequest`] into either final
//! text or a list of tool calls the model wants made. Infrastructure crates
//! (e.g. `llm`) implement it; the orchestration layer only ever sees this
//! trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ProviderError, TokenUsage, ToolArgs, ToolName};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool the model asked for.
    pub name: ToolName,
    /// Arguments, stringly typed.
    pub args: ToolArgs,
}

/// One turn of an agent's conversation within a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Text from the caller (the bound task prompt).
    User(String),
    /// A tool call previously requested by the model.
    ToolCall(ToolCall),
    /// The output of a tool call, fed back to the model.
    ToolResult {
        /// Tool that produced the output.
        name: ToolName,
        /// Raw tool output.
        output: String,
    },
}

/// Declared parameter of a tool, as shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Argument name.
    pub name: String,
    /// What the argument means.
    pub description: String,
    /// Whether the model must supply it.
    pub required: bool,
}

impl ToolParameter {
    /// A mandatory string parameter.
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Declaration of a tool the model may call during this request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Name the model must use to call the tool.
    pub name: ToolName,
    /// What the tool does.
    pub description: String,
    /// Accepted arguments.
    pub parameters: Vec<ToolParameter>,
}

/// Everything a provider needs for one model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Persona and goal of the calling role.
    pub system_instruction: Option<String>,
    /// Upstream artifact texts the model should work from, in stage order.
    pub context: Vec<String>,
    /// Conversation so far; the first message is the task prompt.
    pub messages: Vec<Message>,
    /// Tools the model may call. Empty means no tool calling.
    pub tools: Vec<ToolSpec>,
}

/// What the model produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Generation {
    /// A final answer.
    Text(String),
    /// The model wants these tools called before it answers.
    ToolCalls(Vec<ToolCall>),
}

/// Response to a [`GenerationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Final text or requested tool calls.
    pub output: Generation,
    /// Tokens consumed by this call.
    pub usage: TokenUsage,
}

impl GenerationResponse {
    /// A final-text response with no usage accounting.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            output: Generation::Text(text.into()),
            usage: TokenUsage::default(),
        }
    }

    /// A tool-call response with no usage accounting.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            output: Generation::ToolCalls(calls),
            usage: TokenUsage::default(),
        }
    }
}

/// Text-generation backend used by agent roles and LLM-backed tools.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Provider/model label used in logs (e.g. `"gemini/gemini-2.0-flash"`).
    fn name(&self) -> &str;

    /// Performs one model call.
    ///
    /// # Errors
    ///
    /// [`ProviderError`] on transport, authentication or response errors.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Generates plain text from a prompt and its context, without tools.
    ///
    /// # Errors
    ///
    /// [`ProviderError`] if the call fails or the model requests a tool call
    /// despite none being offered.
    async fn generate_text(&self, prompt: &str, context: &[String]) -> Result<String, ProviderError> {
        let request = GenerationRequest {
            system_instruction: None,
            context: context.to_vec(),
            messages: vec![Message::User(prompt.to_string())],
            tools: Vec::new(),
        };
        match self.generate(request).await?.output {
            Generation::Text(text) => Ok(text),
            Generation::ToolCalls(_) => Err(ProviderError::permanent(
                "model requested a tool call but no tools were offered",
            )),
        }
    }
}

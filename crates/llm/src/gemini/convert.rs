//! Wire types for the Gemini `generateContent` API and conversion to and
//! from the pipeline's provider types.

use std::collections::BTreeMap;

use pipeline::{
    Generation, GenerationRequest, GenerationResponse, Message, ProviderError, TokenUsage,
    ToolArgs, ToolCall, ToolName, ToolSpec, CONTEXT_SEPARATOR,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a content turn. Unknown part kinds are kept as raw JSON so a
/// new field in the response never fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    Text {
        text: String,
    },
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tools {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Schema>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Builds the wire request.
///
/// Upstream context is sent as a separate text part ahead of the first user
/// turn. Consecutive turns of the same role are merged, which keeps parallel
/// function calls and their responses in one turn each as the API requires.
pub fn build_request(request: &GenerationRequest, temperature: Option<f32>) -> GenerateContentRequest {
    let mut contents: Vec<Content> = Vec::with_capacity(request.messages.len());
    let mut context_pending = !request.context.is_empty();

    for message in &request.messages {
        let (role, part) = match message {
            Message::User(text) => (ROLE_USER, Part::Text { text: text.clone() }),
            Message::ToolCall(call) => (
                ROLE_MODEL,
                Part::FunctionCall {
                    function_call: FunctionCall {
                        name: call.name.to_string(),
                        args: call
                            .args
                            .iter()
                            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                            .collect(),
                    },
                },
            ),
            Message::ToolResult { name, output } => (
                ROLE_USER,
                Part::FunctionResponse {
                    function_response: FunctionResponse {
                        name: name.to_string(),
                        response: serde_json::json!({ "name": name.as_str(), "content": output }),
                    },
                },
            ),
        };

        if context_pending && role == ROLE_USER {
            push_part(&mut contents, ROLE_USER, context_part(&request.context));
            context_pending = false;
        }
        push_part(&mut contents, role, part);
    }
    if context_pending {
        push_part(&mut contents, ROLE_USER, context_part(&request.context));
    }

    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![Tools {
            function_declarations: request.tools.iter().map(declaration).collect(),
        }]
    };

    GenerateContentRequest {
        system_instruction: request.system_instruction.as_ref().map(|text| Content {
            role: None,
            parts: vec![Part::Text { text: text.clone() }],
        }),
        contents,
        tools,
        generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

fn context_part(context: &[String]) -> Part {
    Part::Text {
        text: format!(
            "Context from earlier stages:\n\n{}",
            context.join(CONTEXT_SEPARATOR)
        ),
    }
}

fn push_part(contents: &mut Vec<Content>, role: &str, part: Part) {
    match contents.last_mut() {
        Some(last) if last.role.as_deref() == Some(role) => last.parts.push(part),
        _ => contents.push(Content {
            role: Some(role.to_string()),
            parts: vec![part],
        }),
    }
}

fn declaration(spec: &ToolSpec) -> FunctionDeclaration {
    let parameters = (!spec.parameters.is_empty()).then(|| Schema {
        schema_type: "OBJECT",
        properties: spec
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    PropertySchema {
                        schema_type: "STRING",
                        description: p.description.clone(),
                    },
                )
            })
            .collect(),
        required: spec
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.clone())
            .collect(),
    });
    FunctionDeclaration {
        name: spec.name.to_string(),
        description: spec.description.clone(),
        parameters,
    }
}

/// Converts a wire response into final text or tool calls.
///
/// # Errors
///
/// - Non-retryable [`ProviderError`] if the prompt was blocked.
/// - Retryable [`ProviderError`] if the model returned no usable output.
pub fn parse_response(response: GenerateContentResponse) -> Result<GenerationResponse, ProviderError> {
    let usage = response
        .usage_metadata
        .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
        .unwrap_or_default();

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => ProviderError::permanent(format!("prompt blocked by Gemini: {reason}")),
            None => ProviderError::transient("Gemini returned no candidates"),
        });
    };
    let finish_reason = candidate.finish_reason.unwrap_or_default();
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut calls = Vec::new();
    let mut text = String::new();
    for part in parts {
        match part {
            Part::FunctionCall { function_call } => calls.push(tool_call(function_call)?),
            Part::Text { text: t } => text.push_str(&t),
            Part::FunctionResponse { .. } | Part::Other(_) => {}
        }
    }

    let output = if !calls.is_empty() {
        Generation::ToolCalls(calls)
    } else if !text.trim().is_empty() {
        Generation::Text(text)
    } else {
        return Err(ProviderError::transient(format!(
            "Gemini returned an empty response (finish reason: {finish_reason})"
        )));
    };
    Ok(GenerationResponse { output, usage })
}

fn tool_call(call: FunctionCall) -> Result<ToolCall, ProviderError> {
    let name = ToolName::new(call.name)
        .ok_or_else(|| ProviderError::transient("Gemini requested a function with no name"))?;
    let args: ToolArgs = call
        .args
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect();
    Ok(ToolCall { name, args })
}

//! Per-invocation conversation buffer.
//!
//! An agent role may need several provider calls to finish one stage (each
//! tool call round-trips through the model). The buffer holds what is resent
//! on each call. It lives for exactly one invocation; nothing carries over
//! between stages or runs.

use crate::{Message, ToolCall};

/// Messages resent to the provider on every iteration of one invocation.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    prompt: String,
    memory: bool,
    turns: Vec<Message>,
}

impl ConversationBuffer {
    /// Starts a conversation with the bound task prompt.
    ///
    /// With `memory` on, every tool exchange is kept; with it off, only the
    /// most recent exchange is kept alongside the prompt.
    pub fn new(prompt: impl Into<String>, memory: bool) -> Self {
        Self {
            prompt: prompt.into(),
            memory,
            turns: Vec::new(),
        }
    }

    /// Records one model-requested batch of tool calls and their outputs.
    pub fn record_tool_exchange(&mut self, exchange: Vec<(ToolCall, String)>) {
        if !self.memory {
            self.turns.clear();
        }
        for (call, output) in exchange {
            let name = call.name.clone();
            self.turns.push(Message::ToolCall(call));
            self.turns.push(Message::ToolResult { name, output });
        }
    }

    /// The messages for the next provider call: the prompt, then kept turns.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(Message::User(self.prompt.clone()));
        messages.extend(self.turns.iter().cloned());
        messages
    }
}

//! Agent-role invocation: the reasoning loop between one role and the
//! capability provider.
//!
//! One invocation sends the bound task prompt, serves any tool calls the model
//! asks for from the role's own [`pipeline::ToolSet`], and returns the first
//! final-text answer. Iteration, rate and wall-clock limits from the role's
//! [`pipeline::ResourceLimits`] are enforced here; retry is not.

use std::collections::HashMap;
use std::sync::Arc;

use pipeline::{
    AgentError, AgentRole, CapabilityProvider, ConversationBuffer, Generation, GenerationRequest,
    ProviderError, RetryPolicy, RoleName, TokenUsage, ToolName, Topic,
};
use tokio::sync::Mutex;
use tracing::Instrument;

use crate::rate_limit::CallRateLimiter;

/// What one successful invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentOutput {
    /// The model's final answer.
    pub text: String,
    /// Tools called along the way, in call order.
    pub tool_calls: Vec<ToolName>,
    /// Tokens consumed across every provider call.
    pub usage: TokenUsage,
}

type SharedLimiter = Arc<Mutex<CallRateLimiter>>;

/// Drives agent roles against a capability provider.
///
/// Holds no per-run state; one executor serves any number of concurrent
/// invocations. The only thing shared between invocations is each role's
/// call-rate window, so a role's `max_calls_per_minute` holds across retried
/// attempts and concurrent runs. Clones share the same windows.
#[derive(Clone)]
pub struct AgentExecutor {
    provider: Arc<dyn CapabilityProvider>,
    limiters: Arc<Mutex<HashMap<RoleName, SharedLimiter>>>,
}

impl AgentExecutor {
    /// Builds an executor calling `provider` for every role.
    pub fn new(provider: Arc<dyn CapabilityProvider>) -> Self {
        Self {
            provider,
            limiters: Arc::default(),
        }
    }

    /// Invokes `role` with a bound prompt and its upstream context.
    ///
    /// The tools offered to the model are exactly the role's configured set.
    ///
    /// # Errors
    ///
    /// - [`AgentError::CapabilityUnavailable`] if a provider call fails.
    /// - [`AgentError::ToolInvocation`] if a tool call fails or the model asks
    ///   for a tool the role does not hold.
    /// - [`AgentError::ResourceLimitExceeded`] if the iteration or wall-clock
    ///   limit is hit before a final answer.
    pub async fn invoke(
        &self,
        role: &AgentRole,
        topic: &Topic,
        prompt: &str,
        context: &[String],
    ) -> Result<AgentOutput, AgentError> {
        let span = tracing::info_span!(
            "agent_invoke",
            role = %role.name(),
            provider = self.provider.name(),
            tools = role.tools().len(),
        );
        let conversation = self.converse(role, topic, prompt, context);

        match role.limits().max_execution_time() {
            Some(limit) => match tokio::time::timeout(limit, conversation).instrument(span).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(role = %role.name(), limit_ms = limit.as_millis() as u64, "Agent invocation timed out");
                    Err(AgentError::ResourceLimitExceeded {
                        limit: format!("max execution time of {:.1}s", limit.as_secs_f64()),
                    })
                }
            },
            None => conversation.instrument(span).await,
        }
    }

    /// The role's call-rate window, created on first use; `None` when the
    /// role is not rate limited.
    async fn limiter_for(&self, role: &AgentRole) -> Option<SharedLimiter> {
        let max_calls = role.limits().max_calls_per_minute()?;
        let mut limiters = self.limiters.lock().await;
        let limiter = limiters
            .entry(role.name().clone())
            .or_insert_with(|| Arc::new(Mutex::new(CallRateLimiter::per_minute(Some(max_calls)))));
        Some(Arc::clone(limiter))
    }

    async fn converse(
        &self,
        role: &AgentRole,
        topic: &Topic,
        prompt: &str,
        context: &[String],
    ) -> Result<AgentOutput, AgentError> {
        let limits = role.limits();
        let limiter = self.limiter_for(role).await;
        let mut buffer = ConversationBuffer::new(prompt, role.memory());
        let system_instruction = role.system_instruction(topic);
        let tool_specs = role.tools().specs();

        let mut output = AgentOutput::default();
        let mut iterations: u32 = 0;

        loop {
            if let Some(max) = limits.max_iterations() {
                if iterations >= max {
                    return Err(AgentError::ResourceLimitExceeded {
                        limit: format!("max iterations ({max}) reached without a final answer"),
                    });
                }
            }
            iterations += 1;
            if let Some(limiter) = &limiter {
                limiter.lock().await.acquire().await;
            }

            let request = GenerationRequest {
                system_instruction: Some(system_instruction.clone()),
                context: context.to_vec(),
                messages: buffer.messages(),
                tools: tool_specs.clone(),
            };
            let response = self.provider.generate(request).await?;
            output.usage += response.usage;

            let calls = match response.output {
                Generation::Text(text) => {
                    tracing::debug!(iterations, chars = text.len(), "Agent produced final answer");
                    output.text = text;
                    return Ok(output);
                }
                Generation::ToolCalls(calls) => calls,
            };

            let Some(first) = calls.first() else {
                return Err(ProviderError::transient("model returned neither text nor tool calls").into());
            };
            if role.tools().is_empty() {
                return Err(AgentError::ToolInvocation {
                    tool: first.name.clone(),
                    message: "role has no permitted tools".to_string(),
                    retry: RetryPolicy::RETRY,
                });
            }

            let mut exchange = Vec::with_capacity(calls.len());
            for call in calls {
                tracing::info!(tool = %call.name, iteration = iterations, "Calling tool");
                let result = role.tools().invoke_tool(&call.name, &call.args).await?;
                output.tool_calls.push(call.name.clone());
                exchange.push((call, result));
            }
            buffer.record_tool_exchange(exchange);
        }
    }
}

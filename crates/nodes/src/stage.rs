//! Stage-task execution.
//!
//! A stage binds the topic and upstream output into its prompt, runs its
//! agent role, checks the output contract, persists the text, and wraps the
//! outcome in a [`StageResult`]. Every failure is converted into a
//! failure-tagged result here; nothing escapes as a raw error.

use std::sync::Arc;

use pipeline::{
    AgentError, ArtifactStore, ErrorKind, RetryPolicy, StageFailure, StageResult, StageTask,
    StageTrace, Timestamp, Topic,
};

use crate::agent::AgentExecutor;

/// Executes single stages. Stateless apart from its collaborators.
#[derive(Clone)]
pub struct StageExecutor {
    agents: AgentExecutor,
    store: Arc<dyn ArtifactStore>,
}

impl StageExecutor {
    pub fn new(agents: AgentExecutor, store: Arc<dyn ArtifactStore>) -> Self {
        Self { agents, store }
    }

    /// Executes `task` once.
    ///
    /// `upstream` holds the results of the stage's declared dependencies, in
    /// declaration order. Their texts become the agent's context.
    pub async fn execute(
        &self,
        task: &StageTask,
        topic: &Topic,
        upstream: &[&StageResult],
    ) -> StageResult {
        let mut trace = StageTrace {
            context: upstream.iter().map(|r| r.text().to_string()).collect(),
            started_at: Some(Timestamp::now()),
            ..StageTrace::default()
        };
        let prompt = task.render_prompt(topic, &trace.context);

        let output = match self
            .agents
            .invoke(task.role(), topic, &prompt, &trace.context)
            .await
        {
            Ok(output) => output,
            Err(err) => return fail(task, trace, agent_failure(&err)),
        };
        trace.tool_calls = output.tool_calls;
        trace.usage = output.usage;

        if let Some(contract) = task.contract() {
            if let Err(violation) = contract.check(&output.text) {
                let failure = StageFailure {
                    kind: ErrorKind::OutputContractViolation,
                    message: format!("{} contract: {violation}", contract.name()),
                    retry: RetryPolicy::RETRY,
                };
                return fail(task, trace, failure);
            }
        }

        if let Some(key) = task.output() {
            if let Err(err) = self.store.write(key, &output.text).await {
                let failure = StageFailure {
                    kind: ErrorKind::PersistenceError,
                    message: err.to_string(),
                    retry: RetryPolicy::NonRetryable,
                };
                return fail(task, trace, failure);
            }
        }

        tracing::info!(
            stage = %task.name(),
            chars = output.text.len(),
            tool_calls = trace.tool_calls.len(),
            tokens = %trace.usage.total(),
            "Stage succeeded"
        );
        StageResult::succeeded(
            task.name().clone(),
            task.role().name().clone(),
            output.text,
            trace,
        )
    }
}

fn agent_failure(err: &AgentError) -> StageFailure {
    StageFailure {
        kind: err.kind(),
        message: err.to_string(),
        retry: err.retry_policy(),
    }
}

fn fail(task: &StageTask, trace: StageTrace, failure: StageFailure) -> StageResult {
    tracing::warn!(
        stage = %task.name(),
        kind = %failure.kind,
        retryable = failure.retry.is_retryable(),
        error = %failure.message,
        "Stage failed"
    );
    StageResult::failed(
        task.name().clone(),
        task.role().name().clone(),
        failure,
        trace,
    )
}

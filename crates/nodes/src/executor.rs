//! The pipeline orchestrator.
//!
//! Runs the stages of a [`PipelineDefinition`] strictly in order for one
//! topic, feeding each stage the results of its declared upstream stages,
//! retrying retryable stage failures with exponential back-off, and halting
//! on the first stage that still fails.

use std::sync::Arc;

use pipeline::{
    ArtifactStore, CapabilityProvider, CompletedRun, PipelineDefinition, PipelineError, PipelineRun,
    RetryPolicy, StageResult, StageTask, Topic,
};
use tracing::Instrument;

use crate::agent::AgentExecutor;
use crate::retry::RetryConfig;
use crate::stage::StageExecutor;

/// Executes pipeline runs.
///
/// Shares only immutable configuration between runs, so one executor may
/// serve many concurrent runs for different topics.
#[derive(Clone)]
pub struct PipelineExecutor {
    definition: Arc<PipelineDefinition>,
    stages: StageExecutor,
    store: Arc<dyn ArtifactStore>,
    retry: RetryConfig,
}

impl PipelineExecutor {
    /// Builds an executor with the default [`RetryConfig`].
    pub fn new(
        definition: Arc<PipelineDefinition>,
        provider: Arc<dyn CapabilityProvider>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let stages = StageExecutor::new(AgentExecutor::new(provider), Arc::clone(&store));
        Self {
            definition,
            stages,
            store,
            retry: RetryConfig::default(),
        }
    }

    /// Replaces the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The pipeline this executor runs.
    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    /// The store stage outputs are persisted to.
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Runs every stage for `topic` and returns their results in order.
    ///
    /// When a stage fails, the persistence targets of that stage and of every
    /// later stage are cleared, so a failed run never leaves artifacts from an
    /// earlier run looking current. A successful run only ever writes.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidInput`] if the topic is blank; no stage runs.
    /// - [`PipelineError::StageFailed`] naming the first stage that failed
    ///   after its retries; later stages never run.
    pub async fn run(&self, topic: &str) -> Result<CompletedRun, PipelineError> {
        let topic = Topic::parse(topic)?;
        let run = PipelineRun::new(topic, &self.definition);
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %run.id(),
            pipeline = %self.definition.name(),
        );
        self.drive(run).instrument(span).await
    }

    /// Runs every stage for `topic` and returns only the final stage's result.
    ///
    /// # Errors
    ///
    /// As [`PipelineExecutor::run`].
    pub async fn run_final(&self, topic: &str) -> Result<StageResult, PipelineError> {
        self.run(topic)
            .await?
            .into_final_result()
            .ok_or_else(|| PipelineError::InvalidState {
                reason: "completed run has no results".to_string(),
            })
    }

    async fn drive(&self, mut run: PipelineRun) -> Result<CompletedRun, PipelineError> {
        tracing::info!(topic = %run.topic(), stages = self.definition.stages().len(), "Pipeline run starting");

        run.start()?;
        let topic = run.topic().clone();

        for (index, task) in self.definition.stages().iter().enumerate() {
            let (result, attempts) = {
                let upstream: Vec<&StageResult> = task
                    .upstream()
                    .iter()
                    .filter_map(|name| run.result(name))
                    .collect();
                self.execute_with_retry(task, &topic, &upstream).await
            };

            let failure = result.failure().cloned();
            run.record(result)?;

            if let Some(failure) = failure {
                tracing::error!(
                    stage = %task.name(),
                    kind = %failure.kind,
                    attempts,
                    error = %failure.message,
                    "Pipeline run failed"
                );
                self.clear_from(index).await;
                return Err(PipelineError::StageFailed {
                    stage: task.name().clone(),
                    kind: failure.kind,
                    message: failure.message,
                    attempts,
                });
            }
        }

        let completed = run.into_completed()?;
        tracing::info!(stages = completed.results().len(), "Pipeline run completed");
        Ok(completed)
    }

    /// Removes the persistence targets of stage `index` and every later stage.
    async fn clear_from(&self, index: usize) {
        for task in &self.definition.stages()[index..] {
            let Some(key) = task.output() else { continue };
            if let Err(e) = self.store.remove(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to clear stale artifact");
            }
        }
    }

    /// Executes one stage, re-executing it while its failure is retryable and
    /// attempts remain. Returns the last result and the number of attempts.
    async fn execute_with_retry(
        &self,
        task: &StageTask,
        topic: &Topic,
        upstream: &[&StageResult],
    ) -> (StageResult, u32) {
        let mut attempt: u32 = 1;
        let mut delay = self.retry.initial_delay;

        loop {
            let span = tracing::info_span!("stage", stage = %task.name(), attempt);
            let result = self
                .stages
                .execute(task, topic, upstream)
                .instrument(span)
                .await;

            let wait = match result.failure().map(|f| f.retry) {
                Some(RetryPolicy::Retryable { after }) if attempt < self.retry.max_attempts => {
                    after.map_or(delay, |after| after.min(self.retry.max_delay))
                }
                _ => return (result, attempt),
            };

            tracing::warn!(
                stage = %task.name(),
                attempt,
                max_attempts = self.retry.max_attempts,
                delay_ms = wait.as_millis() as u64,
                "Stage failed with retryable error; retrying"
            );
            tokio::time::sleep(wait).await;
            delay = self.retry.next_delay(delay);
            attempt += 1;
        }
    }
}

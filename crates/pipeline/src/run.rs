//! Stage results and the pipeline-run state machine.
//!
//! ```text
//! Created ──start──▶ Running(0) ──ok──▶ Running(1) ──ok──▶ … ──ok──▶ Completed
//!                         │                  │
//!                         └──failed──▶ Failed ◀──failed──┘
//! ```
//!
//! `Completed` and `Failed` are terminal. Results are always a strict prefix
//! of the stage list: the result at index *i* belongs to stage *i*, and no
//! stage gets a result before every earlier stage has one.

use serde::{Deserialize, Serialize};

use crate::{
    ErrorKind, PipelineDefinition, PipelineError, PipelineRunId, RetryPolicy, RoleName, StageName,
    Timestamp, TokenUsage, ToolName, Topic,
};

// ---------------------------------------------------------------------------
// Stage results
// ---------------------------------------------------------------------------

/// Why a stage execution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// Category of the failure.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Whether the orchestrator may execute the stage again.
    pub retry: RetryPolicy,
}

/// Outcome of one stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageOutcome {
    /// The stage produced accepted output (and persisted it if configured).
    Succeeded,
    /// The stage failed; its text is empty.
    Failed(StageFailure),
}

/// What a stage consumed and spent while executing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTrace {
    /// Upstream texts handed to the agent, in dependency order.
    pub context: Vec<String>,
    /// Tools called during the invocation, in call order.
    pub tool_calls: Vec<ToolName>,
    /// Tokens consumed across every provider call of the invocation.
    pub usage: TokenUsage,
    /// When execution began.
    pub started_at: Option<Timestamp>,
}

/// Immutable record of one stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    stage: StageName,
    role: RoleName,
    text: String,
    trace: StageTrace,
    outcome: StageOutcome,
    finished_at: Timestamp,
}

impl StageResult {
    /// A successful result carrying the stage's raw output.
    pub fn succeeded(stage: StageName, role: RoleName, text: String, trace: StageTrace) -> Self {
        Self {
            stage,
            role,
            text,
            trace,
            outcome: StageOutcome::Succeeded,
            finished_at: Timestamp::now(),
        }
    }

    /// A failed result. The text is always empty.
    pub fn failed(stage: StageName, role: RoleName, failure: StageFailure, trace: StageTrace) -> Self {
        Self {
            stage,
            role,
            text: String::new(),
            trace,
            outcome: StageOutcome::Failed(failure),
            finished_at: Timestamp::now(),
        }
    }

    /// The stage that produced this result.
    pub fn stage(&self) -> &StageName {
        &self.stage
    }

    /// The role that ran the stage.
    pub fn role(&self) -> &RoleName {
        &self.role
    }

    /// The raw text the stage produced.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The upstream context the stage was given.
    pub fn context(&self) -> &[String] {
        &self.trace.context
    }

    /// Context, tool calls and token usage of the execution.
    pub fn trace(&self) -> &StageTrace {
        &self.trace
    }

    /// Success, or the failure with its kind and retry policy.
    pub fn outcome(&self) -> &StageOutcome {
        &self.outcome
    }

    /// When the execution finished.
    pub fn finished_at(&self) -> Timestamp {
        self.finished_at
    }

    /// `true` for a success-tagged result.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StageOutcome::Succeeded)
    }

    /// The failure, if the stage failed.
    pub fn failure(&self) -> Option<&StageFailure> {
        match &self.outcome {
            StageOutcome::Succeeded => None,
            StageOutcome::Failed(failure) => Some(failure),
        }
    }
}

// ---------------------------------------------------------------------------
// Run state machine
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`PipelineRun`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Built but no stage has started.
    Created,
    /// Waiting for the result of the stage at this index.
    Running {
        /// Index of the stage currently executing.
        stage_index: usize,
    },
    /// Every stage succeeded.
    Completed,
    /// A stage failed; no later stage ran.
    Failed {
        /// The stage that failed.
        stage: StageName,
        /// Category of the failure.
        kind: ErrorKind,
    },
}

impl RunStatus {
    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

/// One end-to-end execution of a pipeline definition for a single topic.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    id: PipelineRunId,
    topic: Topic,
    stages: Vec<StageName>,
    results: Vec<StageResult>,
    status: RunStatus,
    created_at: Timestamp,
}

impl PipelineRun {
    /// Creates a run in the `Created` state.
    pub fn new(topic: Topic, definition: &PipelineDefinition) -> Self {
        Self {
            id: PipelineRunId::new_random(),
            topic,
            stages: definition.stages().iter().map(|s| s.name().clone()).collect(),
            results: Vec::new(),
            status: RunStatus::Created,
            created_at: Timestamp::now(),
        }
    }

    /// Identifier assigned at creation.
    pub fn id(&self) -> PipelineRunId {
        self.id
    }

    /// Topic the run was started for.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Current lifecycle state.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// When [`PipelineRun::new`] was called.
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Results recorded so far, in stage order.
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// The recorded result of a stage, if it has run.
    pub fn result(&self, stage: &StageName) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage() == stage)
    }

    /// `Created → Running(0)`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidState`] if the run already started.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.status != RunStatus::Created {
            return Err(self.invalid("start", "run already started"));
        }
        self.status = RunStatus::Running { stage_index: 0 };
        tracing::debug!(run_id = %self.id, stage = %self.stages[0], "Run started");
        Ok(())
    }

    /// Records the result of the currently running stage and advances.
    ///
    /// A success moves to the next stage (or `Completed` after the last); a
    /// failure moves to `Failed`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidState`] if the run is not running or the
    /// result belongs to a different stage than the one expected next.
    pub fn record(&mut self, result: StageResult) -> Result<(), PipelineError> {
        let RunStatus::Running { stage_index } = self.status else {
            return Err(self.invalid("record", "run is not running"));
        };
        let expected = &self.stages[stage_index];
        if result.stage() != expected {
            let reason = format!("expected a result for '{expected}', got '{}'", result.stage());
            return Err(self.invalid("record", &reason));
        }

        self.status = match result.failure() {
            Some(failure) => RunStatus::Failed {
                stage: result.stage().clone(),
                kind: failure.kind,
            },
            None if stage_index + 1 == self.stages.len() => RunStatus::Completed,
            None => RunStatus::Running {
                stage_index: stage_index + 1,
            },
        };
        self.results.push(result);
        tracing::debug!(run_id = %self.id, status = ?self.status, "Run advanced");
        Ok(())
    }

    /// Converts a completed run into its result list.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidState`] unless the run is `Completed`.
    pub fn into_completed(self) -> Result<CompletedRun, PipelineError> {
        if self.status != RunStatus::Completed {
            return Err(self.invalid("complete", "run has not completed"));
        }
        Ok(CompletedRun {
            id: self.id,
            topic: self.topic,
            results: self.results,
        })
    }

    fn invalid(&self, action: &str, reason: &str) -> PipelineError {
        PipelineError::InvalidState {
            reason: format!("cannot {action} run {} in state {:?}: {reason}", self.id, self.status),
        }
    }
}

/// The output of a run that completed every stage.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    id: PipelineRunId,
    topic: Topic,
    results: Vec<StageResult>,
}

impl CompletedRun {
    /// Identifier of the run that produced these results.
    pub fn id(&self) -> PipelineRunId {
        self.id
    }

    /// Topic the run was started for.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// One successful result per stage, in declared order.
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// The result of the named stage.
    pub fn result(&self, stage: &StageName) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage() == stage)
    }

    /// The final stage's result.
    pub fn final_result(&self) -> &StageResult {
        // A completed run has a result for every stage, and definitions are
        // never empty.
        &self.results[self.results.len() - 1]
    }

    /// Consumes the run, returning the final stage's result.
    pub fn into_final_result(mut self) -> Option<StageResult> {
        self.results.pop()
    }

    /// Consumes the run, returning every result.
    pub fn into_results(self) -> Vec<StageResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{AgentRole, PipelineName, StageTask};

    fn definition(names: &[&str]) -> PipelineDefinition {
        let role = Arc::new(AgentRole::new(RoleName::new("r").unwrap(), "g", "b"));
        let stages = names
            .iter()
            .map(|n| StageTask::new(StageName::new(*n).unwrap(), Arc::clone(&role), "d", "e"))
            .collect();
        PipelineDefinition::new(PipelineName::new("p").unwrap(), stages).unwrap()
    }

    fn ok(stage: &str) -> StageResult {
        StageResult::succeeded(
            StageName::new(stage).unwrap(),
            RoleName::new("r").unwrap(),
            format!("{stage} output"),
            StageTrace::default(),
        )
    }

    fn failed(stage: &str) -> StageResult {
        StageResult::failed(
            StageName::new(stage).unwrap(),
            RoleName::new("r").unwrap(),
            StageFailure {
                kind: ErrorKind::CapabilityUnavailable,
                message: "down".to_string(),
                retry: RetryPolicy::NonRetryable,
            },
            StageTrace::default(),
        )
    }

    fn new_run(names: &[&str]) -> PipelineRun {
        PipelineRun::new(Topic::parse("t").unwrap(), &definition(names))
    }

    #[test]
    fn walks_every_stage_to_completion() {
        let mut run = new_run(&["a", "b"]);
        assert_eq!(run.status(), &RunStatus::Created);
        run.start().unwrap();
        run.record(ok("a")).unwrap();
        assert_eq!(run.status(), &RunStatus::Running { stage_index: 1 });
        run.record(ok("b")).unwrap();
        assert_eq!(run.status(), &RunStatus::Completed);

        let completed = run.into_completed().unwrap();
        assert_eq!(completed.results().len(), 2);
        assert_eq!(completed.final_result().text(), "b output");
    }

    #[test]
    fn failure_is_terminal() {
        let mut run = new_run(&["a", "b", "c"]);
        run.start().unwrap();
        run.record(ok("a")).unwrap();
        run.record(failed("b")).unwrap();
        assert!(run.status().is_terminal());
        assert!(matches!(run.status(), RunStatus::Failed { stage, .. } if stage.as_str() == "b"));

        assert!(run.record(ok("c")).is_err());
        assert!(run.clone().into_completed().is_err());
        assert_eq!(run.results().len(), 2);
    }

    #[test]
    fn results_must_arrive_in_order() {
        let mut run = new_run(&["a", "b"]);
        run.start().unwrap();
        let err = run.record(ok("b")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { .. }));
        assert!(run.results().is_empty());
    }

    #[test]
    fn cannot_record_before_start_or_start_twice() {
        let mut run = new_run(&["a"]);
        assert!(run.record(ok("a")).is_err());
        run.start().unwrap();
        assert!(run.start().is_err());
    }

    #[test]
    fn failed_result_has_no_text() {
        let result = failed("a");
        assert!(!result.is_success());
        assert!(result.text().is_empty());
        assert_eq!(result.failure().unwrap().kind, ErrorKind::CapabilityUnavailable);
    }
}

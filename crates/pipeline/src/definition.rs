//! Declarative pipeline definitions: agent roles, stage tasks, and the ordered
//! stage list.
//!
//! Everything here is immutable once built. A [`PipelineDefinition`] is
//! validated on construction and can be shared by reference across any number
//! of concurrent runs.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{ArtifactKey, PipelineError, PipelineName, ResourceLimits, RoleName, StageName, ToolSet, Topic};

/// Placeholder replaced by the run topic in every template.
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Placeholder replaced by the concatenated upstream stage output.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Separator placed between upstream outputs when they are concatenated.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Substitutes `{topic}` and `{context}` into a template.
///
/// Placeholders are replaced in one left-to-right pass, so a topic or context
/// that itself contains a placeholder is inserted verbatim. Other
/// brace-delimited text is left untouched, so templates may contain literal
/// JSON examples.
pub fn bind_template(template: &str, topic: &Topic, context: &[String]) -> String {
    let mut bound = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(idx) = rest.find('{') {
        bound.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(after) = tail.strip_prefix(TOPIC_PLACEHOLDER) {
            bound.push_str(topic.as_str());
            rest = after;
        } else if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            bound.push_str(&context.join(CONTEXT_SEPARATOR));
            rest = after;
        } else {
            bound.push('{');
            rest = &tail[1..];
        }
    }
    bound.push_str(rest);
    bound
}

// ---------------------------------------------------------------------------
// Agent role
// ---------------------------------------------------------------------------

/// A configured persona: what it is trying to achieve, how it behaves, which
/// tools it may use and how much it may spend.
#[derive(Debug)]
pub struct AgentRole {
    name: RoleName,
    goal: String,
    backstory: String,
    tools: ToolSet,
    limits: ResourceLimits,
    memory: bool,
}

impl AgentRole {
    /// Creates a role with no tools, no limits and conversation memory on.
    pub fn new(name: RoleName, goal: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            name,
            goal: goal.into(),
            backstory: backstory.into(),
            tools: ToolSet::empty(),
            limits: ResourceLimits::unlimited(),
            memory: true,
        }
    }

    /// Grants the role exactly these tools.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the role's resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Whether earlier turns of an invocation are resent on every iteration.
    #[must_use]
    pub fn with_memory(mut self, memory: bool) -> Self {
        self.memory = memory;
        self
    }

    /// The role's name, also used in its system instruction.
    pub fn name(&self) -> &RoleName {
        &self.name
    }

    /// The goal template, bound with the topic per run.
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// The persona template.
    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    /// The only tools this role may call.
    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Iteration, call-rate and wall-clock limits.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Whether conversation memory is on.
    pub fn memory(&self) -> bool {
        self.memory
    }

    /// The system instruction sent with every provider call for this role.
    pub fn system_instruction(&self, topic: &Topic) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.name,
            bind_template(&self.backstory, topic, &[]),
            bind_template(&self.goal, topic, &[]),
        )
    }
}

// ---------------------------------------------------------------------------
// Output contracts
// ---------------------------------------------------------------------------

/// A mechanical check applied to a stage's output before it is accepted.
///
/// Stages without a contract accept any text; the expected-output description
/// is then advisory only.
pub trait OutputContract: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Returns a description of the first violation found, if any.
    fn check(&self, output: &str) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// Stage task
// ---------------------------------------------------------------------------

/// One unit of work bound to an agent role.
#[derive(Clone)]
pub struct StageTask {
    name: StageName,
    role: Arc<AgentRole>,
    description: String,
    expected_output: String,
    depends_on: Vec<StageName>,
    output: Option<ArtifactKey>,
    contract: Option<Arc<dyn OutputContract>>,
}

impl StageTask {
    /// Creates a stage with no upstream dependencies and no persistence target.
    pub fn new(
        name: StageName,
        role: Arc<AgentRole>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name,
            role,
            description: description.into(),
            expected_output: expected_output.into(),
            depends_on: Vec::new(),
            output: None,
            contract: None,
        }
    }

    /// Adds an upstream stage whose output is passed in as context.
    #[must_use]
    pub fn depends_on(mut self, upstream: StageName) -> Self {
        self.depends_on.push(upstream);
        self
    }

    /// Persists the stage's raw output under `key`.
    #[must_use]
    pub fn persist_to(mut self, key: ArtifactKey) -> Self {
        self.output = Some(key);
        self
    }

    /// Requires the stage output to satisfy `contract`.
    #[must_use]
    pub fn with_contract(mut self, contract: Arc<dyn OutputContract>) -> Self {
        self.contract = Some(contract);
        self
    }

    /// The stage's unique name within its pipeline.
    pub fn name(&self) -> &StageName {
        &self.name
    }

    /// The role that performs this stage.
    pub fn role(&self) -> &Arc<AgentRole> {
        &self.role
    }

    /// The task description template.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// What the final answer must contain, as told to the model.
    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    /// Stages whose output this stage receives, in declared order.
    pub fn upstream(&self) -> &[StageName] {
        &self.depends_on
    }

    /// Where the output is persisted, if anywhere.
    pub fn output(&self) -> Option<&ArtifactKey> {
        self.output.as_ref()
    }

    /// The mechanical output check, if any.
    pub fn contract(&self) -> Option<&Arc<dyn OutputContract>> {
        self.contract.as_ref()
    }

    /// Renders the task prompt for one run.
    ///
    /// The description and expected output are bound with the topic and the
    /// concatenated upstream context; the context itself also travels to the
    /// provider as a separate list.
    pub fn render_prompt(&self, topic: &Topic, context: &[String]) -> String {
        format!(
            "{}\n\nThis is the expected criteria for your final answer:\n{}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            bind_template(&self.description, topic, context),
            bind_template(&self.expected_output, topic, context),
        )
    }
}

impl std::fmt::Debug for StageTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageTask")
            .field("name", &self.name)
            .field("role", self.role.name())
            .field("depends_on", &self.depends_on)
            .field("output", &self.output)
            .field("contract", &self.contract.as_ref().map(|c| c.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Pipeline definition
// ---------------------------------------------------------------------------

/// An ordered, validated list of stages.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    name: PipelineName,
    stages: Vec<StageTask>,
}

impl PipelineDefinition {
    /// Validates and builds a definition.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidDefinition`] if the stage list is empty, a
    /// stage name repeats, a stage depends on itself or on a later or unknown
    /// stage, or two stages persist to the same key.
    pub fn new(name: PipelineName, stages: Vec<StageTask>) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(invalid(format!("pipeline '{name}' has no stages")));
        }

        let mut seen: HashSet<&StageName> = HashSet::new();
        let mut keys: HashSet<&ArtifactKey> = HashSet::new();
        for stage in &stages {
            for upstream in stage.upstream() {
                if !seen.contains(upstream) {
                    return Err(invalid(format!(
                        "stage '{}' depends on '{}', which is not an earlier stage",
                        stage.name(),
                        upstream
                    )));
                }
            }
            if !seen.insert(stage.name()) {
                return Err(invalid(format!("stage name '{}' is used twice", stage.name())));
            }
            if let Some(key) = stage.output() {
                if !keys.insert(key) {
                    return Err(invalid(format!(
                        "artifact '{key}' is the persistence target of more than one stage"
                    )));
                }
            }
        }

        Ok(Self { name, stages })
    }

    /// The pipeline's name, recorded on every run span.
    pub fn name(&self) -> &PipelineName {
        &self.name
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &[StageTask] {
        &self.stages
    }

    /// Looks up a stage by name.
    pub fn stage(&self, name: &StageName) -> Option<&StageTask> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Every persistence target, in stage order.
    pub fn artifact_keys(&self) -> Vec<&ArtifactKey> {
        self.stages.iter().filter_map(StageTask::output).collect()
    }

    /// The last stage, whose output is the run's final artifact.
    pub fn final_stage(&self) -> &StageTask {
        // Non-empty by construction.
        &self.stages[self.stages.len() - 1]
    }
}

fn invalid(reason: String) -> PipelineError {
    PipelineError::InvalidDefinition { reason }
}

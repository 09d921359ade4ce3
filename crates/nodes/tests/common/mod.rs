#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nodes::RetryConfig;
use pipeline::{
    AgentRole, ArtifactError, ArtifactKey, ArtifactStore, CapabilityProvider, GenerationRequest,
    GenerationResponse, Message, PipelineDefinition, PipelineName, ProviderError, RoleName,
    StageName, StageTask, Tool, ToolArgs, ToolError, ToolName, ToolParameter, ToolSet,
};

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

type Responder =
    Box<dyn Fn(&GenerationRequest) -> Result<GenerationResponse, ProviderError> + Send + Sync>;

/// Provider whose answers come from a closure; records every request.
pub struct ScriptedProvider {
    respond: Responder,
    delay: Option<Duration>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(
        respond: impl Fn(&GenerationRequest) -> Result<GenerationResponse, ProviderError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers `"<role> on <first prompt line>"`, followed by the context.
    pub fn echo() -> Self {
        Self::new(|req| Ok(GenerationResponse::text(echo_text(req))))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_for(&self, role: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| role_of(r) == role)
            .count()
    }
}

#[async_trait]
impl CapabilityProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(&request)
    }
}

/// The role name from a system instruction of the form `"You are <role>. …"`.
pub fn role_of(request: &GenerationRequest) -> String {
    request
        .system_instruction
        .as_deref()
        .and_then(|s| s.strip_prefix("You are "))
        .and_then(|s| s.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// The bound task prompt.
pub fn prompt_of(request: &GenerationRequest) -> &str {
    match request.messages.first() {
        Some(Message::User(prompt)) => prompt,
        _ => "",
    }
}

pub fn echo_text(request: &GenerationRequest) -> String {
    let first_line = prompt_of(request).lines().next().unwrap_or_default();
    let mut text = format!("{} on {first_line}", role_of(request));
    if !request.context.is_empty() {
        text.push_str(" <= ");
        text.push_str(&request.context.join(" / "));
    }
    text
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// Tool that returns a fixed output (or error) and counts its invocations.
pub struct RecordingTool {
    name: ToolName,
    output: Result<String, ToolError>,
    calls: AtomicUsize,
    args: Mutex<Vec<ToolArgs>>,
}

impl RecordingTool {
    pub fn new(name: &str, output: &str) -> Arc<Self> {
        Arc::new(Self {
            name: ToolName::new(name).unwrap(),
            output: Ok(output.to_string()),
            calls: AtomicUsize::new(0),
            args: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str, error: ToolError) -> Arc<Self> {
        Arc::new(Self {
            name: ToolName::new(name).unwrap(),
            output: Err(error),
            calls: AtomicUsize::new(0),
            args: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn args(&self) -> Vec<ToolArgs> {
        self.args.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &ToolName {
        &self.name
    }

    fn description(&self) -> &str {
        "records its calls"
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("query", "what to look up")]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.args.lock().unwrap().push(args.clone());
        self.output.clone()
    }
}

pub fn tool_set(tools: &[Arc<RecordingTool>]) -> ToolSet {
    ToolSet::new(tools.iter().map(|t| Arc::clone(t) as Arc<dyn Tool>).collect()).unwrap()
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Store whose writes always fail.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn write(&self, key: &ArtifactKey, _content: &str) -> Result<(), ArtifactError> {
        Err(ArtifactError::Io {
            key: key.clone(),
            message: "disk full".to_string(),
        })
    }

    async fn read(&self, _key: &ArtifactKey) -> Result<Option<String>, ArtifactError> {
        Ok(None)
    }

    async fn remove(&self, _key: &ArtifactKey) -> Result<(), ArtifactError> {
        Ok(())
    }
}

/// Store that accepts writes and keeps nothing.
#[derive(Default)]
pub struct ForgetfulStore;

#[async_trait]
impl ArtifactStore for ForgetfulStore {
    async fn write(&self, _key: &ArtifactKey, _content: &str) -> Result<(), ArtifactError> {
        Ok(())
    }

    async fn read(&self, _key: &ArtifactKey) -> Result<Option<String>, ArtifactError> {
        Ok(None)
    }

    async fn remove(&self, _key: &ArtifactKey) -> Result<(), ArtifactError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

pub fn role(name: &str) -> AgentRole {
    AgentRole::new(RoleName::new(name).unwrap(), "Do {topic} well", "A tester.")
}

pub fn stage_name(name: &str) -> StageName {
    StageName::new(name).unwrap()
}

pub fn key(name: &str) -> ArtifactKey {
    ArtifactKey::new(name).unwrap()
}

pub fn task(name: &str, role: AgentRole) -> StageTask {
    StageTask::new(
        stage_name(name),
        Arc::new(role),
        format!("Stage {name} on {{topic}}"),
        "Some text.",
    )
}

pub fn definition(stages: Vec<StageTask>) -> Arc<PipelineDefinition> {
    Arc::new(PipelineDefinition::new(PipelineName::new("test").unwrap(), stages).unwrap())
}

/// `n` chained stages `s1..sn` run by roles `role-1..role-n`, each persisting
/// to `s<i>.md` when `persist` is set.
pub fn chain(n: usize, persist: bool) -> Arc<PipelineDefinition> {
    let stages = (1..=n)
        .map(|i| {
            let name = format!("s{i}");
            let mut stage = task(&name, role(&format!("role-{i}")));
            if i > 1 {
                stage = stage.depends_on(stage_name(&format!("s{}", i - 1)));
            }
            if persist {
                stage = stage.persist_to(key(&format!("{name}.md")));
            }
            stage
        })
        .collect();
    definition(stages)
}

pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::default()
        .with_max_attempts(max_attempts)
        .with_initial_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
}

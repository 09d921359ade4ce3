//! Port trait for tools and the per-role permitted tool set.
//!
//! Tool permissions are capabilities: each agent role is built with a
//! [`ToolSet`] holding the exact tool handles it may use. There is no global
//! registry; a call for a name outside the role's own set fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{AgentError, PipelineError, RetryPolicy, ToolError, ToolName, ToolParameter, ToolSpec};

/// Arguments for a tool call.
pub type ToolArgs = BTreeMap<String, String>;

/// An external capability (search, scrape, analyse, rewrite) an agent role may
/// call during its turn.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool.
    fn name(&self) -> &ToolName;

    /// One-line description shown to the model.
    fn description(&self) -> &str;

    /// Arguments the tool accepts.
    fn parameters(&self) -> Vec<ToolParameter>;

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// [`ToolError`] if arguments are missing or the external call fails.
    async fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError>;

    /// Declaration handed to the provider.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().clone(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Returns the value of a required argument.
///
/// # Errors
///
/// A non-retryable [`ToolError`] if the argument is absent or blank.
pub fn required_arg<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str, ToolError> {
    match args.get(name).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ToolError::permanent(format!("missing required argument '{name}'"))),
    }
}

/// Immutable, ordered set of tools permitted to one agent role.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    /// A set with no tools; a role holding it never issues tool calls.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a set from tool handles, preserving order.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidDefinition`] if two tools share a name.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, PipelineError> {
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|t| t.name() == tool.name()) {
                return Err(PipelineError::InvalidDefinition {
                    reason: format!("tool '{}' granted twice to the same role", tool.name()),
                });
            }
        }
        Ok(Self { tools })
    }

    /// `true` if no tools are permitted.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Number of permitted tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Names of the permitted tools, in grant order.
    pub fn names(&self) -> Vec<&ToolName> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Declarations for every permitted tool, in grant order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Looks up a permitted tool.
    pub fn get(&self, name: &ToolName) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Calls a permitted tool by name.
    ///
    /// # Errors
    ///
    /// [`AgentError::ToolInvocation`] if the tool is not in this set or the
    /// call itself fails.
    pub async fn invoke_tool(&self, name: &ToolName, args: &ToolArgs) -> Result<String, AgentError> {
        let tool = self.get(name).ok_or_else(|| AgentError::ToolInvocation {
            tool: name.clone(),
            message: "tool is not permitted for this role".to_string(),
            retry: RetryPolicy::RETRY,
        })?;
        tool.invoke(args)
            .await
            .map_err(|e| AgentError::tool(name.clone(), e))
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

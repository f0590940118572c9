//! Executable actions addressable by name from the model's proposed action.
//!
//! Every tool is a function from an input string to an output string; on
//! failure the combined process output still travels back inside the error
//! so the loop can surface it to the model as an observation.

pub mod exec;
pub mod jq;
pub mod kubectl;
pub mod python;
pub mod trivy;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::{AgentError, AgentResult};
pub use exec::ExecContext;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Registry name the model addresses this tool by
    fn name(&self) -> &str;

    /// What the tool accepts and produces, for the system prompt
    fn description(&self) -> &str;

    /// Execute the tool against the given input
    async fn call(&self, input: &str, ctx: &ExecContext) -> AgentResult<String>;
}

/// The set of tools addressable from the model's proposed action. Populated
/// once during process initialization and shared read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard tool palette.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(kubectl::KubectlTool));
        registry.register(Box::new(python::PythonTool::from_env()));
        registry.register(Box::new(trivy::TrivyTool));
        registry.register(Box::new(jq::JqTool));
        registry
    }

    /// Register a tool under its name. Names are unique; a later
    /// registration replaces an earlier one.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(Box::as_ref)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Execute the named tool, or report it as missing.
    pub async fn dispatch(
        &self,
        name: &str,
        input: &str,
        ctx: &ExecContext,
    ) -> AgentResult<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.call(input, ctx).await
    }
}

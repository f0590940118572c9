use async_trait::async_trait;

use super::exec::{run_command, ExecContext};
use super::Tool;
use crate::errors::AgentResult;

/// Shell snippet sourced before the interpreter starts, so a virtualenv with
/// the Kubernetes client library can be activated.
const PYTHON_ENV_VAR: &str = "KUBEPILOT_PYTHON_ENV";

pub struct PythonTool {
    activate: Option<String>,
}

impl PythonTool {
    pub fn new(activate: Option<String>) -> Self {
        Self { activate }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(PYTHON_ENV_VAR).ok().filter(|v| !v.is_empty()))
    }
}

#[async_trait]
impl Tool for PythonTool {
    fn name(&self) -> &str {
        "python"
    }

    fn description(&self) -> &str {
        "Runs a Python script with the Kubernetes Python SDK available. Input: a Python script. Output: the stdout and stderr of the script."
    }

    async fn call(&self, input: &str, ctx: &ExecContext) -> AgentResult<String> {
        // Escape embedded quotes so the script survives the shell boundary.
        let escaped = input.replace('"', "\\\"");
        let command = match &self.activate {
            Some(activate) => format!("source {} && python3 -c \"{}\"", activate, escaped),
            None => format!("python3 -c \"{}\"", escaped),
        };
        run_command(&command, ctx).await
    }
}

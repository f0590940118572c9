use async_trait::async_trait;

use super::exec::{run_with_stdin, ExecContext};
use super::Tool;
use crate::errors::{AgentError, AgentResult};

pub struct JqTool;

#[async_trait]
impl Tool for JqTool {
    fn name(&self) -> &str {
        "jq"
    }

    fn description(&self) -> &str {
        "Processes JSON data. Input: 'JSON data | jq expression'. Output: the query result."
    }

    async fn call(&self, input: &str, ctx: &ExecContext) -> AgentResult<String> {
        let (data, expression) = split_input(input)?;
        run_with_stdin("jq", &[expression], data, ctx).await
    }
}

/// Split the `data | expression` form on the first pipe, so the jq
/// expression itself may contain pipes. The data side must be valid JSON
/// before any process is spawned.
fn split_input(input: &str) -> AgentResult<(&str, &str)> {
    let (data, expression) = input.split_once('|').ok_or_else(|| {
        AgentError::InvalidParameters(
            "input must be of the form 'JSON data | jq expression'".to_string(),
        )
    })?;

    let data = data.trim();
    let expression = expression.trim();

    serde_json::from_str::<serde_json::Value>(data)
        .map_err(|e| AgentError::InvalidParameters(format!("invalid JSON data: {}", e)))?;

    if expression.is_empty() {
        return Err(AgentError::InvalidParameters(
            "empty jq expression".to_string(),
        ));
    }

    Ok((data, expression))
}

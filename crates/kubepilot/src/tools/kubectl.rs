use async_trait::async_trait;

use super::exec::{run_command, ExecContext};
use super::Tool;
use crate::errors::AgentResult;

/// Transient noise from aggregated API servers that only confuses the model.
const FILTERED_PATTERNS: &[&str] = &[
    "the server is currently unable to handle the request",
    "memcache.go",
    "couldn't get resource list for",
];

pub struct KubectlTool;

#[async_trait]
impl Tool for KubectlTool {
    fn name(&self) -> &str {
        "kubectl"
    }

    fn description(&self) -> &str {
        "Executes kubectl commands against the cluster. Input: a kubectl command. Output: the result of the command."
    }

    async fn call(&self, input: &str, ctx: &ExecContext) -> AgentResult<String> {
        let input = input.trim();
        let command = if input.starts_with("kubectl") {
            input.to_string()
        } else {
            format!("kubectl {}", input)
        };

        let output = run_command(&command, ctx).await?;
        Ok(filter_output(&output))
    }
}

/// Drop klog error lines (an `E` followed by the four-digit date stamp) and
/// known transient aggregated-API warnings. All other lines pass through
/// unchanged.
fn filter_output(output: &str) -> String {
    output
        .lines()
        .filter(|line| {
            if FILTERED_PATTERNS.iter().any(|p| line.contains(p)) {
                return false;
            }
            !is_klog_error_line(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_klog_error_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() > 5
        && bytes[0] == b'E'
        && bytes[1..5].iter().all(u8::is_ascii_digit)
}

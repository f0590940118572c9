//! Subprocess plumbing shared by the CLI-style tools.
//!
//! Plain commands are whitespace-split and spawned directly, which keeps
//! simple reads free of shell interpretation; anything carrying shell
//! metacharacters is handed to `bash -c` so the compound pipelines the model
//! likes to emit still work. Stdout and stderr are combined either way.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::errors::{AgentError, AgentResult};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline and cancellation signal handed to every tool execution.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl ExecContext {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TOOL_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

/// True when the command needs a shell interpreter: pipes, redirection,
/// command chaining, or quoting.
pub fn needs_shell(command: &str) -> bool {
    command.contains("&&")
        || command
            .chars()
            .any(|c| matches!(c, '|' | '>' | '<' | ';' | '"' | '\''))
}

/// Run a command line, combining stdout and stderr. Commands with shell
/// metacharacters go through `bash -c`; everything else is token-split and
/// spawned directly.
pub async fn run_command(command: &str, ctx: &ExecContext) -> AgentResult<String> {
    tracing::debug!(command, shell = needs_shell(command), "executing command");

    let mut cmd = if needs_shell(command) {
        let mut cmd = Command::new("bash");
        cmd.arg("-c").arg(command);
        cmd
    } else {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| AgentError::InvalidParameters("empty command".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(parts);
        cmd
    };

    wait_with_output(&mut cmd, None, ctx).await
}

/// Run a program with explicit arguments, bypassing the shell entirely.
pub async fn run_args(program: &str, args: &[&str], ctx: &ExecContext) -> AgentResult<String> {
    tracing::debug!(program, ?args, "executing command");
    let mut cmd = Command::new(program);
    cmd.args(args);
    wait_with_output(&mut cmd, None, ctx).await
}

/// Run a program with data streamed over stdin.
pub async fn run_with_stdin(
    program: &str,
    args: &[&str],
    stdin_data: &str,
    ctx: &ExecContext,
) -> AgentResult<String> {
    tracing::debug!(program, ?args, "executing command with piped stdin");
    let mut cmd = Command::new(program);
    cmd.args(args);
    wait_with_output(&mut cmd, Some(stdin_data), ctx).await
}

async fn wait_with_output(
    cmd: &mut Command,
    stdin_data: Option<&str>,
    ctx: &ExecContext,
) -> AgentResult<String> {
    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| AgentError::ExecutionError(e.to_string()))?;

    if let Some(data) = stdin_data {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Internal("child stdin not captured".to_string()))?;
        stdin
            .write_all(data.as_bytes())
            .await
            .map_err(|e| AgentError::ExecutionError(e.to_string()))?;
        drop(stdin);
    }

    // Dropping the in-flight future on cancel or timeout kills the child
    // via kill_on_drop.
    let output = tokio::select! {
        _ = ctx.cancel.cancelled() => return Err(AgentError::Cancelled),
        result = tokio::time::timeout(ctx.timeout, child.wait_with_output()) => match result {
            Err(_) => {
                return Err(AgentError::ExecutionError(format!(
                    "command timed out after {}s",
                    ctx.timeout.as_secs()
                )))
            }
            Ok(output) => output.map_err(|e| AgentError::ExecutionError(e.to_string()))?,
        },
    };

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        Err(AgentError::ExecutionError(combined))
    }
}

//! Thin entry points that assemble a system prompt and a user message, then
//! hand off to the reasoning loop. Facades never inspect intermediate state.

use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentOutcome};
use crate::errors::RunError;
use crate::models::message::Message;
use crate::prompts::EXECUTE_SYSTEM_PROMPT;

/// Run the execute facade: diagnose and operate on the cluster according to
/// free-form instructions.
pub async fn execute(
    agent: &Agent,
    instructions: &str,
    cancel: CancellationToken,
) -> Result<AgentOutcome, RunError> {
    let instructions = instructions.trim();
    if instructions.is_empty() {
        return Err(RunError::EmptyInstructions);
    }

    let prompts = vec![
        Message::system(EXECUTE_SYSTEM_PROMPT),
        Message::user(format!("Here are the instructions: {}", instructions)),
    ];

    agent.run(prompts, cancel).await
}

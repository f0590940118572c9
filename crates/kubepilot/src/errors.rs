use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("The parameters to the tool call were invalid: {0}")]
    InvalidParameters(String),

    #[error("The tool failed during execution with the following output: \n{0}")]
    ExecutionError(String),

    #[error("The execution was cancelled before completion")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Errors surfaced by the LLM client. Transient variants are retried with
/// backoff before the caller ever sees them.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("missing API credential: pass an API key or set OPENAI_API_KEY")]
    MissingCredential,

    #[error("rate limited by provider (status {status})")]
    RateLimited { status: u16 },

    #[error("provider server error (status {status})")]
    Server { status: u16 },

    #[error("provider request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("context length exceeded: {0}")]
    ContextLengthExceeded(String),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::Server { .. } => true,
            ProviderError::Transport(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

/// Errors surfaced by a whole agent loop invocation. Tool and parse failures
/// are recovered inside the loop and never appear here.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("prompts cannot be empty")]
    EmptyPrompts,

    #[error("instructions cannot be empty")]
    EmptyInstructions,

    #[error("chat completion error: {0}")]
    Completion(#[from] ProviderError),

    #[error("the request was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

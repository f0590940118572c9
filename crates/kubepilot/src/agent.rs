//! The reasoning loop: a bounded Thought → Action → Observation controller.
//!
//! Each run owns its chat history. The model proposes one action per turn in
//! the envelope format; the loop executes it, writes the truncated
//! observation back into the envelope, and echoes the envelope as a
//! user-role message so the model can tell ground truth from its own
//! speculation. Tool and parse failures are recovered inside the loop;
//! transport failures and cancellation surface to the caller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{AgentError, RunError};
use crate::models::envelope::ActionEnvelope;
use crate::models::message::Message;
use crate::normalizer::{self, LlmTurn};
use crate::providers::base::Provider;
use crate::token_counter::TokenCounter;
use crate::tools::exec::DEFAULT_TOOL_TIMEOUT;
use crate::tools::{ExecContext, ToolRegistry};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Observations are individually capped before entering the history.
const OBSERVATION_TOKEN_LIMIT: usize = 1024;

const SUMMARIZE_PROMPT: &str =
    "Summarize all the chat history and respond to original question with final answer";

/// Returned when a tool succeeds with empty output, instead of letting the
/// model chase the same empty result forever.
pub const EMPTY_OBSERVATION_ANSWER: &str = "The executed tool returned no output for this query. \
     Please rephrase the question or provide more specific details (for example the namespace or \
     resource name) and try again.";

/// Knobs for one loop invocation. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model: String,
    /// Token budget for the history on every completion call
    pub max_tokens: usize,
    /// LLM turns allowed after the initial one; zero means the default
    pub max_iterations: usize,
    pub count_tokens: bool,
    pub verbose: bool,
}

impl AgentConfig {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self {
            model: model.into(),
            max_tokens: 2048,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            count_tokens: false,
            verbose: false,
        }
    }
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    /// Set when the iteration cap cut the reasoning short; the answer is
    /// then the last one seen, possibly empty.
    pub truncated: bool,
    pub history: Vec<Message>,
}

/// Agent wires a chat provider to the tool registry and drives the loop.
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: Arc<ToolRegistry>,
    counter: TokenCounter,
    config: AgentConfig,
}

enum Observation {
    Empty,
    Text(String),
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, registry: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            registry,
            counter: TokenCounter::new(),
            config,
        }
    }

    /// Token count of a history, for callers that report usage.
    pub fn history_tokens(&self, history: &[Message]) -> usize {
        self.counter.count_messages(history, &self.config.model)
    }

    /// Drive the loop to a final answer.
    ///
    /// `prompts` is the initial history, system message first; it is owned
    /// by this invocation and returned inside the outcome.
    pub async fn run(
        &self,
        prompts: Vec<Message>,
        cancel: CancellationToken,
    ) -> Result<AgentOutcome, RunError> {
        if prompts.is_empty() {
            return Err(RunError::EmptyPrompts);
        }

        let max_iterations = if self.config.max_iterations == 0 {
            DEFAULT_MAX_ITERATIONS
        } else {
            self.config.max_iterations
        };

        let mut history = prompts;
        let mut iterations = 0usize;
        let mut last_final_answer = String::new();

        let mut response = self.chat(&mut history, &cancel).await?;

        loop {
            match normalizer::normalize(&response) {
                LlmTurn::FinalAnswer { text, thought } => {
                    if self.config.verbose {
                        info!(thought = %thought, "final answer received");
                    }
                    return Ok(self.finish(text, false, history));
                }
                LlmTurn::Malformed { .. } => {
                    debug!("unable to parse a tool call from the reply, summarizing the final answer");
                    return self.summarize(history, &cancel).await;
                }
                LlmTurn::ToolCall(envelope) => {
                    iterations += 1;
                    if iterations > max_iterations {
                        warn!(max_iterations, "max iterations reached");
                        return Ok(self.finish(last_final_answer, true, history));
                    }
                    last_final_answer = envelope.final_answer.clone();

                    if self.config.verbose {
                        info!(
                            iteration = iterations,
                            tool = %envelope.action.name,
                            thought = %envelope.thought,
                            "executing action"
                        );
                    }

                    match self.observe(&envelope, &cancel).await? {
                        Observation::Empty => {
                            return Ok(self.finish(
                                EMPTY_OBSERVATION_ANSWER.to_string(),
                                false,
                                history,
                            ))
                        }
                        Observation::Text(observation) => {
                            let observation = self.counter.truncate(
                                &observation,
                                &self.config.model,
                                OBSERVATION_TOKEN_LIMIT,
                            );
                            // Echo the envelope back with thought and action
                            // verbatim and the observation overwritten.
                            let mut echo = envelope;
                            echo.observation = observation;
                            let serialized = serde_json::to_string(&echo)
                                .map_err(|e| RunError::Internal(e.to_string()))?;
                            history.push(Message::user(serialized));

                            response = self.chat(&mut history, &cancel).await?;
                        }
                    }
                }
            }
        }
    }

    /// Execute the proposed action and shape its result into an observation.
    /// Tool problems become feedback to the model, never loop failures.
    async fn observe(
        &self,
        envelope: &ActionEnvelope,
        cancel: &CancellationToken,
    ) -> Result<Observation, RunError> {
        let name = envelope.action.name.as_str();
        let ctx = ExecContext::new(DEFAULT_TOOL_TIMEOUT, cancel.clone());

        let observation = match self.registry.dispatch(name, &envelope.action.input, &ctx).await {
            Ok(output) => {
                let output = output.trim().to_string();
                if output.is_empty() {
                    debug!(tool = name, "tool succeeded with empty output");
                    return Ok(Observation::Empty);
                }
                output
            }
            Err(AgentError::Cancelled) => return Err(RunError::Cancelled),
            Err(AgentError::ToolNotFound(_)) => {
                warn!(tool = name, "tool not available");
                format!(
                    "Tool {} is not available. Consider switching to other supported tools.",
                    name
                )
            }
            Err(AgentError::ExecutionError(output)) => {
                warn!(tool = name, "tool execution failed");
                format!(
                    "Tool {} failed with error {}. Consider refining the inputs for the tool.",
                    name,
                    output.trim()
                )
            }
            Err(err) => {
                warn!(tool = name, error = %err, "tool rejected the input");
                format!(
                    "Tool {} failed with error {}. Consider refining the inputs for the tool.",
                    name, err
                )
            }
        };

        if self.config.verbose {
            info!(tool = name, observation = %observation, "observation");
        }
        Ok(Observation::Text(observation))
    }

    /// Fallback for unparseable replies: ask the model to wrap up, then
    /// salvage a final answer from whatever comes back.
    async fn summarize(
        &self,
        mut history: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome, RunError> {
        history.push(Message::user(SUMMARIZE_PROMPT));
        let response = self.chat(&mut history, cancel).await?;

        let answer = normalizer::extract_field(&response, "final_answer")
            .filter(|a| !a.is_empty())
            .unwrap_or(response);
        Ok(self.finish(answer, false, history))
    }

    /// One completion round: trim the history to budget, call the provider,
    /// append the assistant reply.
    async fn chat(
        &self,
        history: &mut Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<String, RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let trimmed = self.counter.trim_history(
            std::mem::take(history),
            &self.config.model,
            self.config.max_tokens,
        );
        *history = trimmed;

        let completion =
            self.provider
                .complete(&self.config.model, self.config.max_tokens as i32, history);
        let (text, usage) = tokio::select! {
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            result = completion => result?,
        };

        debug!(
            prompt_tokens = ?usage.prompt_tokens,
            completion_tokens = ?usage.completion_tokens,
            "chat completion finished"
        );

        history.push(Message::assistant(text.clone()));
        Ok(text)
    }

    fn finish(&self, answer: String, truncated: bool, history: Vec<Message>) -> AgentOutcome {
        if self.config.count_tokens {
            let total = self.counter.count_messages(&history, &self.config.model);
            info!(total_tokens = total, "total tokens for this run");
        }
        AgentOutcome {
            answer,
            truncated,
            history,
        }
    }
}

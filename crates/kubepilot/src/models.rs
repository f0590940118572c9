//! These models represent the objects passed between the agent and the LLM:
//!
//! - chat messages in the OpenAI role/content shape, sent to the provider
//! - the action envelope, the JSON record the model replies with on every
//!   turn of the reasoning loop
//!
//! Messages are immutable once appended to a history; the envelope is
//! re-serialized back into a user message after the loop fills in the
//! observation.
pub mod envelope;
pub mod message;

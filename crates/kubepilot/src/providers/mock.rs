use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::base::{Provider, Usage};
use crate::errors::ProviderError;
use crate::models::message::Message;

/// A provider that replays a scripted list of replies, for tests.
pub struct MockProvider {
    responses: Mutex<VecDeque<String>>,
}

impl MockProvider {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        _model: &str,
        _max_tokens: i32,
        _messages: &[Message],
    ) -> Result<(String, Usage), ProviderError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .map(|text| (text, Usage::default()))
            .ok_or_else(|| ProviderError::InvalidResponse("mock provider exhausted".to_string()))
    }
}

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::retry::chat_backoff;
use super::utils::{api_error, response_text, response_usage};
use crate::errors::ProviderError;
use crate::models::message::Message;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
    backoff: ExponentialBuilder,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            config,
            backoff: chat_backoff(),
        })
    }

    #[cfg(test)]
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    async fn post(&self, payload: &Value) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited {
                status: status.as_u16(),
            }),
            status if status.is_server_error() => Err(ProviderError::Server {
                status: status.as_u16(),
            }),
            status => Err(ProviderError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        model: &str,
        max_tokens: i32,
        messages: &[Message],
    ) -> Result<(String, Usage), ProviderError> {
        let mut payload = json!({
            "model": model,
            "messages": messages,
        });
        if max_tokens > 0 {
            payload["max_tokens"] = json!(max_tokens);
        }

        let response = (|| async { self.post(&payload).await })
            .retry(self.backoff)
            .when(ProviderError::is_transient)
            .notify(|err: &ProviderError, dur: Duration| {
                tracing::warn!(error = %err, delay_ms = dur.as_millis() as u64, "retrying chat completion");
            })
            .await?;

        if let Some(error) = response.get("error") {
            return Err(api_error(error));
        }

        Ok((response_text(&response)?, response_usage(&response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::retry::test_backoff;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27}
        })
    }

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(OpenAiProviderConfig {
            host: server.uri(),
            api_key: "test_api_key".to_string(),
        })
        .unwrap()
        .with_backoff(test_backoff())
    }

    #[tokio::test]
    async fn test_complete_basic() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test_api_key"))
            .and(body_partial_json(json!({"model": "gpt-4"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hello!")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let messages = vec![
            Message::system("You are a helpful assistant."),
            Message::user("Hello?"),
        ];

        let (text, usage) = provider.complete("gpt-4", 2048, &messages).await.unwrap();
        assert_eq!(text, "Hello!");
        assert_eq!(usage.prompt_tokens, Some(12));
        assert_eq!(usage.total_tokens, Some(27));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Recovered")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let messages = vec![Message::user("Hello?")];

        let (text, _) = provider.complete("gpt-4", 0, &messages).await.unwrap();
        assert_eq!(text, "Recovered");
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let messages = vec![Message::user("Hello?")];

        let err = provider.complete("gpt-4", 0, &messages).await.unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid key"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_in_body_error_surfaces() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": "context_length_exceeded", "message": "too long"}
            })))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let messages = vec![Message::user("Hello?")];

        let err = provider.complete("gpt-4", 0, &messages).await.unwrap_err();
        assert!(matches!(err, ProviderError::ContextLengthExceeded(_)));
    }
}

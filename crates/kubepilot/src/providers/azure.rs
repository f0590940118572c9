use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::AzureProviderConfig;
use super::retry::chat_backoff;
use super::utils::{api_error, response_text, response_usage};
use crate::errors::ProviderError;
use crate::models::message::Message;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AzureProvider {
    client: Client,
    config: AzureProviderConfig,
    backoff: ExponentialBuilder,
}

/// Map a model identifier to an Azure deployment name by removing the
/// characters deployment names disallow (`gpt-3.5-turbo` → `gpt-35-turbo`).
pub fn deployment_for(model: &str) -> String {
    model.chars().filter(|c| *c != '.' && *c != ':').collect()
}

impl AzureProvider {
    pub fn new(config: AzureProviderConfig) -> Result<Self, ProviderError> {
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

    async fn post(&self, deployment: &str, payload: &Value) -> Result<Value, ProviderError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions",
            self.config.endpoint.trim_end_matches('/'),
            deployment
        );

        let response = self
            .client
            .post(&url)
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
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
impl Provider for AzureProvider {
    async fn complete(
        &self,
        model: &str,
        max_tokens: i32,
        messages: &[Message],
    ) -> Result<(String, Usage), ProviderError> {
        let deployment = deployment_for(model);

        // The deployment in the path selects the model; the body carries
        // only messages and generation parameters.
        let mut payload = json!({ "messages": messages });
        if max_tokens > 0 {
            payload["max_tokens"] = json!(max_tokens);
        }

        let response = (|| async { self.post(&deployment, &payload).await })
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

use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use kubepilot::agent::{Agent, AgentConfig};
use kubepilot::errors::RunError;
use kubepilot::facade;
use kubepilot::normalizer;
use kubepilot::providers::{configs::ProviderConfig, factory};

use crate::state::AppState;

/// Overall deadline for one request; the loop is cancelled when it fires.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub instructions: String,
    #[serde(default)]
    pub args: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub current_model: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub selected_models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub message: String,
    pub status: &'static str,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

/// Fold instructions and args into one instruction line, dropping the
/// command prefix UI clients tend to send along.
fn assemble_instructions(req: &ExecuteRequest) -> String {
    let mut instructions = req.instructions.clone();
    if !req.args.is_empty() && !instructions.contains(&req.args) {
        instructions = format!("{} {}", instructions, req.args);
    }

    let instructions = instructions.trim();
    let instructions = instructions.strip_prefix("/execute").unwrap_or(instructions);
    let instructions = instructions.strip_prefix("execute").unwrap_or(instructions);
    instructions.trim().to_string()
}

async fn execute_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let api_key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Missing API Key"))?;

    let instructions = assemble_instructions(&req);
    if instructions.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "instructions cannot be empty",
        ));
    }

    let model = if req.current_model.is_empty() {
        state.agent_settings.model.clone()
    } else {
        req.current_model.clone()
    };

    debug!(
        instructions = %instructions,
        model = %model,
        base_url = %req.base_url,
        cluster = %req.cluster,
        "execute request received"
    );

    // The model profile lives for this request only.
    let base_url = (!req.base_url.is_empty()).then_some(req.base_url.as_str());
    let provider_config = ProviderConfig::from_env(Some(&api_key), base_url)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    let provider = factory::get_provider(provider_config)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let config = AgentConfig {
        model,
        max_tokens: state.agent_settings.max_tokens,
        max_iterations: state.agent_settings.max_iterations,
        count_tokens: true,
        verbose: false,
    };
    let agent = Agent::new(provider, state.registry.clone(), config);

    let cancel = CancellationToken::new();
    let result = tokio::select! {
        _ = tokio::time::sleep(REQUEST_TIMEOUT) => {
            cancel.cancel();
            Err(RunError::Cancelled)
        }
        result = facade::execute(&agent, &instructions, cancel.clone()) => result,
    };

    match result {
        Ok(outcome) => {
            info!(truncated = outcome.truncated, "execute request finished");
            if !outcome.answer.is_empty() && !normalizer::is_placeholder(&outcome.answer) {
                Ok(Json(ExecuteResponse {
                    message: outcome.answer,
                    status: "success",
                }))
            } else {
                Ok(Json(ExecuteResponse {
                    message: "The instructions are still being processed, please retry with a \
                              more specific question."
                        .to_string(),
                    status: "processing",
                }))
            }
        }
        Err(RunError::EmptyInstructions | RunError::EmptyPrompts) => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "instructions cannot be empty",
        )),
        Err(RunError::Cancelled) => Err(ApiError::new(
            StatusCode::REQUEST_TIMEOUT,
            "the request was cancelled before completion",
        )),
        Err(err @ RunError::Completion(_)) => {
            error!(error = %err, "execute request failed");
            Err(ApiError::new(StatusCode::BAD_GATEWAY, err.to_string()))
        }
        Err(err) => {
            error!(error = %err, "execute request failed");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
            ))
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(execute_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::AgentSettings;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_router() -> Router {
        routes(AppState::new(AgentSettings::default()))
    }

    fn request_body() -> String {
        json!({
            "instructions": "how many namespaces?",
            "args": "",
            "provider": "openai",
            "baseUrl": "",
            "currentModel": "",
            "cluster": "default",
            "selectedModels": []
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_missing_api_key_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::post("/execute")
                    .header("Content-Type", "application/json")
                    .body(Body::from(request_body()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_instructions_are_rejected() {
        let body = json!({"instructions": "  ", "args": ""}).to_string();
        let response = test_router()
            .oneshot(
                Request::post("/execute")
                    .header("Content-Type", "application/json")
                    .header("X-API-Key", "sk-test")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_assemble_instructions_merges_args() {
        let req = ExecuteRequest {
            instructions: "scan the image".to_string(),
            args: "nginx:latest".to_string(),
            provider: String::new(),
            base_url: String::new(),
            current_model: String::new(),
            cluster: String::new(),
            selected_models: Vec::new(),
        };
        assert_eq!(assemble_instructions(&req), "scan the image nginx:latest");
    }

    #[test]
    fn test_assemble_instructions_skips_duplicate_args() {
        let req = ExecuteRequest {
            instructions: "scan nginx:latest".to_string(),
            args: "nginx:latest".to_string(),
            provider: String::new(),
            base_url: String::new(),
            current_model: String::new(),
            cluster: String::new(),
            selected_models: Vec::new(),
        };
        assert_eq!(assemble_instructions(&req), "scan nginx:latest");
    }

    #[test]
    fn test_assemble_instructions_strips_command_prefix() {
        let req = ExecuteRequest {
            instructions: "/execute list the pods".to_string(),
            args: String::new(),
            provider: String::new(),
            base_url: String::new(),
            current_model: String::new(),
            cluster: String::new(),
            selected_models: Vec::new(),
        };
        assert_eq!(assemble_instructions(&req), "list the pods");
    }
}

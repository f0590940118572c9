use serde_json::Value;

use super::base::Usage;
use crate::errors::ProviderError;

/// Pull the assistant reply text out of a chat completion response.
pub fn response_text(response: &Value) -> Result<String, ProviderError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "no message content in completion response: {}",
                response
            ))
        })
}

pub fn response_usage(response: &Value) -> Usage {
    let usage = &response["usage"];
    let prompt_tokens = usage["prompt_tokens"].as_i64().map(|v| v as i32);
    let completion_tokens = usage["completion_tokens"].as_i64().map(|v| v as i32);
    let total_tokens = usage["total_tokens"]
        .as_i64()
        .map(|v| v as i32)
        .or_else(|| match (prompt_tokens, completion_tokens) {
            (Some(prompt), Some(completion)) => Some(prompt + completion),
            _ => None,
        });

    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    }
}

/// Map an in-body error object to a provider error, recognizing the
/// context-length case specially so callers can report it distinctly.
pub fn api_error(error: &Value) -> ProviderError {
    let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("");
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error")
        .to_string();

    if code == "context_length_exceeded" || code == "string_above_max_length" {
        ProviderError::ContextLengthExceeded(message)
    } else {
        ProviderError::Api {
            status: 200,
            message: format!("{}: {}", code, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_text() {
        let response = json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }]
        });
        assert_eq!(response_text(&response).unwrap(), "Hello!");
    }

    #[test]
    fn test_response_text_missing_content() {
        let response = json!({"choices": []});
        assert!(matches!(
            response_text(&response),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_response_usage() {
        let response = json!({
            "usage": {"prompt_tokens": 12, "completion_tokens": 15, "total_tokens": 27}
        });
        let usage = response_usage(&response);
        assert_eq!(usage.prompt_tokens, Some(12));
        assert_eq!(usage.completion_tokens, Some(15));
        assert_eq!(usage.total_tokens, Some(27));
    }

    #[test]
    fn test_response_usage_derives_total() {
        let response = json!({
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });
        assert_eq!(response_usage(&response).total_tokens, Some(15));
    }

    #[test]
    fn test_context_length_error_recognized() {
        let error = json!({
            "code": "context_length_exceeded",
            "message": "This message is too long"
        });
        assert!(matches!(
            api_error(&error),
            ProviderError::ContextLengthExceeded(message) if message == "This message is too long"
        ));
    }

    #[test]
    fn test_other_api_error() {
        let error = json!({"code": "invalid_api_key", "message": "bad key"});
        assert!(matches!(api_error(&error), ProviderError::Api { .. }));
    }
}

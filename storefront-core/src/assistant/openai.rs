//! OpenAI-compatible chat completions responder
//!
//! Works against api.openai.com and against local servers that expose the
//! same `/chat/completions` route (vLLM, llama.cpp, LM Studio).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StorefrontError};

use super::retry::classify_transport_error;
use super::{ChatMessage, ModelInfo, ReplyRequest, Responder, EMPTY_REPLY};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Responder backed by an OpenAI-compatible endpoint.
pub struct OpenAIResponder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    retryable_status_codes: Vec<u16>,
}

impl OpenAIResponder {
    /// Create a responder for the hosted OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Create with a custom base URL (local or proxy deployments).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retryable_status_codes: super::RetryConfig::default().retryable_status_codes,
        }
    }

    /// Create from environment variables.
    ///
    /// Reads from:
    /// - `OPENAI_API_KEY` - API key (required)
    /// - `OPENAI_MODEL` - Model name (optional, defaults to "gpt-4o")
    /// - `OPENAI_BASE_URL` - Custom base URL (optional)
    ///
    /// # Errors
    ///
    /// Returns an error if OPENAI_API_KEY is not set.
    pub fn from_env(model: Option<impl Into<String>>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            StorefrontError::Configuration(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })?;

        let model = model
            .map(|m| m.into())
            .or_else(|| std::env::var("OPENAI_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::with_base_url(api_key, model, base_url))
    }

    /// Status codes treated as transient
    pub fn with_retryable_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.retryable_status_codes = codes;
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn status_error(&self, status: reqwest::StatusCode, body: &str) -> StorefrontError {
        let detail = match serde_json::from_str::<OpenAIError>(body) {
            Ok(error) => format!(
                "{}: {}",
                error.error.error_type.unwrap_or_else(|| status.to_string()),
                error.error.message
            ),
            Err(_) => format!("{}: {}", status, body),
        };

        if self.retryable_status_codes.contains(&status.as_u16()) {
            StorefrontError::Transient(detail)
        } else {
            StorefrontError::Backend(detail)
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessageResponse>,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Deserialize)]
struct OpenAIErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Pull the first choice's content out of a completion body
fn extract_content(body: &str) -> Result<String> {
    let response: OpenAIResponse = serde_json::from_str(body).map_err(|e| {
        StorefrontError::Backend(format!("Failed to parse completion response: {}", e))
    })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| StorefrontError::Backend("Backend returned no choices".to_string()))?;

    let content = choice
        .message
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| EMPTY_REPLY.to_string());

    Ok(content)
}

#[async_trait]
impl Responder for OpenAIResponder {
    async fn respond(&self, request: &ReplyRequest) -> Result<String> {
        let body = OpenAIRequest {
            model: &self.model,
            messages: &request.context,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(
            request_id = %request.request_id,
            model = %self.model,
            messages = request.context.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        if !status.is_success() {
            return Err(self.status_error(status, &text));
        }

        extract_content(&text)
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model_name: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    #[test]
    fn test_openai_responder_creation() {
        let responder = OpenAIResponder::new("test-key", "gpt-4o");
        assert_eq!(responder.model(), "gpt-4o");
        assert_eq!(responder.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_custom_base_url_trims_slash() {
        let responder =
            OpenAIResponder::with_base_url("local", "qwen3-8b", "http://localhost:8000/v1/");
        assert_eq!(responder.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("Be brief"), ChatMessage::user("Hello")];
        let body = OpenAIRequest {
            model: "gpt-4o",
            messages: &messages,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Try the trail runners."}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Try the trail runners.");
    }

    #[test]
    fn test_extract_empty_content_falls_back() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(extract_content(body).unwrap(), EMPTY_REPLY);
    }

    #[test]
    fn test_extract_no_choices() {
        let err = extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, StorefrontError::Backend(_)));
    }

    #[test]
    fn test_status_classification() {
        let responder = OpenAIResponder::new("k", "m");

        let busy = responder.status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "busy");
        assert!(busy.is_retryable());

        let body = r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#;
        let denied = responder.status_error(reqwest::StatusCode::UNAUTHORIZED, body);
        assert!(!denied.is_retryable());
        assert!(denied.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let responder = OpenAIResponder::with_base_url("k", "m", "http://127.0.0.1:1/v1");
        let err = responder
            .respond(&ReplyRequest::from_text("hello"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn test_respond_posts_completion_with_bearer_auth() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer shop-key");
                then.status(200).json_body(completion("Try the trail runners."));
            })
            .await;

        let responder =
            OpenAIResponder::with_base_url("shop-key", "gpt-4o-mini", server.url("/v1/"));
        let reply = responder
            .respond(&ReplyRequest::from_text("red shoes"))
            .await
            .unwrap();

        assert_eq!(reply, "Try the trail runners.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_respond_unavailable_is_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(503).body("overloaded");
            })
            .await;

        let responder = OpenAIResponder::with_base_url("k", "m", server.base_url());
        let err = responder
            .respond(&ReplyRequest::from_text("red shoes"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::Transient(_)));
        assert!(err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_respond_unauthorized_is_backend_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401).json_body(serde_json::json!({
                    "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
                }));
            })
            .await;

        let responder = OpenAIResponder::with_base_url("wrong", "m", server.base_url());
        let err = responder
            .respond(&ReplyRequest::from_text("red shoes"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::Backend(_)));
        assert!(err.to_string().contains("Incorrect API key"));
    }

    #[tokio::test]
    async fn test_respond_malformed_body_is_backend_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).body("<html>proxy error</html>");
            })
            .await;

        let responder = OpenAIResponder::with_base_url("k", "m", server.base_url());
        let err = responder
            .respond(&ReplyRequest::from_text("red shoes"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::Backend(_)));
    }

    #[test]
    fn test_model_info() {
        let info = OpenAIResponder::new("test-key", "gpt-4o-mini").model_info();
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model_name, "gpt-4o-mini");
    }
}

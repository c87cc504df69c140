//! OpenAI-compatible backend.
//!
//! Works with Gemini (through Google's OpenAI-compatible endpoint), OpenAI,
//! OpenRouter, Ollama, vLLM, and any other `/chat/completions` service.
//! The assembled prompt is sent as a single user message.

use async_trait::async_trait;
use paperchat_core::{BackendError, GenerationBackend, GenerationRequest, GenerationResponse, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Transport-level timeout used unless one is configured.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// An OpenAI-compatible generation backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Replace the HTTP client's transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(request: &GenerationRequest) -> ApiRequest<'_> {
        ApiRequest {
            model: &request.model,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }

    /// Map a non-success HTTP status to a backend error.
    fn error_for_status(status: u16, body: String) -> BackendError {
        match status {
            429 => BackendError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            402 => BackendError::QuotaExceeded(body),
            404 => BackendError::ModelNotFound(body),
            _ => BackendError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }

    fn parse_response(body: &str) -> Result<GenerationResponse, BackendError> {
        let api_response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(GenerationResponse {
            text: choice.message.content.unwrap_or_default(),
            usage,
            model: api_response.model.unwrap_or_default(),
        })
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

#[async_trait]
impl GenerationBackend for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            provider = %self.name,
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            "Sending generation request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(e.to_string())
                } else {
                    BackendError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if status != 200 {
            warn!(status, body = %body, "Backend returned error");
            return Err(Self::error_for_status(status, body));
        }

        let mut parsed = Self::parse_response(&body)?;
        if parsed.model.is_empty() {
            parsed.model = request.model;
        }
        Ok(parsed)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_uses_the_router_endpoint() {
        let url = crate::router::default_base_url("gemini").unwrap();
        let provider = OpenAiCompatProvider::new("gemini", url, "key");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(
            provider.base_url(),
            "https://generativelanguage.googleapis.com/v1beta/openai"
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = OpenAiCompatProvider::new("x", "http://host/v1/", "k");
        assert_eq!(provider.base_url(), "http://host/v1");
    }

    #[test]
    fn request_body_sends_prompt_as_single_user_message() {
        let mut request = GenerationRequest::new("gemini-2.5-flash-lite", "System\n\nUser: hi");
        request.max_tokens = Some(256);
        let body = serde_json::to_value(OpenAiCompatProvider::request_body(&request)).unwrap();

        assert_eq!(body["model"], "gemini-2.5-flash-lite");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "System\n\nUser: hi");
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn max_tokens_omitted_when_unset() {
        let request = GenerationRequest::new("m", "p");
        let body = serde_json::to_value(OpenAiCompatProvider::request_body(&request)).unwrap();
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn status_mapping() {
        let map = |s| OpenAiCompatProvider::error_for_status(s, "body".into());

        assert!(matches!(map(429), BackendError::RateLimited { .. }));
        assert!(matches!(map(401), BackendError::AuthenticationFailed(_)));
        assert!(matches!(map(403), BackendError::AuthenticationFailed(_)));
        assert!(matches!(map(402), BackendError::QuotaExceeded(_)));
        assert!(matches!(map(404), BackendError::ModelNotFound(_)));
        assert!(matches!(map(503), BackendError::ApiError { status_code: 503, .. }));

        assert!(map(429).is_transient());
        assert!(map(500).is_transient());
        assert!(!map(400).is_transient());
        assert!(!map(401).is_transient());
    }

    #[test]
    fn parse_successful_response() {
        let body = r#"{
            "model": "gemini-2.5-flash-lite",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let resp = OpenAiCompatProvider::parse_response(body).unwrap();
        assert_eq!(resp.text, "Hello!");
        assert_eq!(resp.model, "gemini-2.5-flash-lite");
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_response_without_usage_or_model() {
        let body = r#"{"choices":[{"message":{"content":"ok"}}]}"#;
        let resp = OpenAiCompatProvider::parse_response(body).unwrap();
        assert_eq!(resp.text, "ok");
        assert!(resp.usage.is_none());
        assert!(resp.model.is_empty());
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let err = OpenAiCompatProvider::parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn garbage_body_is_invalid_response() {
        let err = OpenAiCompatProvider::parse_response("<html>oops</html>").unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transient() {
        let provider = OpenAiCompatProvider::new("dead", "http://127.0.0.1:9", "k")
            .with_timeout(Duration::from_secs(2));
        let err = provider
            .generate(GenerationRequest::new("m", "p"))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
    }
}

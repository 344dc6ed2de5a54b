//! `DashScope` chat completions client.
//!
//! Talks to the OpenAI-compatible endpoint (`{base}/chat/completions`) with a
//! structured-output response format. The API key is optional at startup; a
//! missing key is reported on each request instead.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::instrument;

use super::error::AssistantError;
use super::prompt::response_format;
use super::types::{CompletionRequest, Message};
use crate::config::AssistantConfig;

/// Longest upstream error text echoed back to clients.
const MAX_ERROR_TEXT_CHARS: usize = 1000;

/// Something that can answer a chat completion request.
///
/// Returns the raw upstream JSON; interpreting it is the caller's job.
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    /// Send `messages` and return the upstream response body.
    async fn complete(&self, messages: Vec<Message>) -> Result<Value, AssistantError>;
}

/// `DashScope` API client.
#[derive(Clone)]
pub struct DashScopeClient {
    inner: Arc<DashScopeClientInner>,
}

struct DashScopeClientInner {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl DashScopeClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::ClientBuild` if the HTTP client cannot be built.
    pub fn new(config: &AssistantConfig) -> Result<Self, AssistantError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(AssistantError::ClientBuild)?;

        Ok(Self {
            inner: Arc::new(DashScopeClientInner {
                client,
                endpoint: completions_endpoint(config.base_url.as_str()),
                model: config.model.clone(),
                api_key: config.api_key.clone(),
            }),
        })
    }

    /// Handle an error status code.
    async fn handle_error_status(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> AssistantError {
        let body = match response.text().await {
            Ok(text) => serde_json::from_str::<Value>(&text).unwrap_or_else(|_| {
                json!({ "error": text.chars().take(MAX_ERROR_TEXT_CHARS).collect::<String>() })
            }),
            Err(e) => json!({ "error": e.to_string() }),
        };

        tracing::warn!(status = status.as_u16(), "Upstream returned an error");
        AssistantError::UpstreamStatus {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl ChatCompletions for DashScopeClient {
    #[instrument(skip(self, messages), fields(model = %self.inner.model, messages = messages.len()))]
    async fn complete(&self, messages: Vec<Message>) -> Result<Value, AssistantError> {
        let api_key = self
            .inner
            .api_key
            .as_ref()
            .ok_or(AssistantError::MissingApiKey)?;

        let request = CompletionRequest {
            model: &self.inner.model,
            messages: &messages,
            stream: false,
            response_format: response_format(),
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_status(status, response).await);
        }

        response
            .json::<Value>()
            .await
            .map_err(|_| AssistantError::UnexpectedFormat)
    }
}

/// `{base}/chat/completions`, tolerating a trailing slash on the base.
fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::DEFAULT_DASHSCOPE_BASE_URL;

    #[test]
    fn test_completions_endpoint() {
        assert_eq!(
            completions_endpoint(DEFAULT_DASHSCOPE_BASE_URL),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
        assert_eq!(
            completions_endpoint("http://localhost:9000/v1/"),
            "http://localhost:9000/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let config = AssistantConfig {
            api_key: None,
            base_url: url::Url::parse("http://127.0.0.1:9").unwrap(),
            model: "qwen-plus".to_string(),
            timeout: Duration::from_secs(1),
            chat_rate: "10/minute".parse().unwrap(),
        };
        let client = DashScopeClient::new(&config).unwrap();

        let err = client.complete(vec![Message::new("user", "hi")]).await.unwrap_err();
        assert!(matches!(err, AssistantError::MissingApiKey));
    }
}

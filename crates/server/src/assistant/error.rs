//! Error types for the shopping assistant.

use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur while answering an assistant chat.
///
/// Every variant is reported to the client as a 400; only `ClientBuild`
/// happens at startup.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// No API key configured for the upstream.
    #[error("Server is not configured: DASHSCOPE_API_KEY is missing")]
    MissingApiKey,

    /// HTTP request to the upstream failed before a response arrived.
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with an error status.
    #[error("upstream returned HTTP {status}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Upstream JSON body, or `{"error": <text>}` if it was not JSON.
        body: Value,
    },

    /// `choices[0].message.content` missing from the upstream reply.
    #[error("Upstream response format unexpected")]
    UnexpectedFormat,

    /// Content was neither a string nor a JSON object.
    #[error("Upstream content is not a string")]
    ContentNotString,

    /// Content string did not parse as JSON.
    #[error("Model did not return valid JSON")]
    InvalidJson,

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),
}

impl AssistantError {
    /// Client-facing JSON body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        match self {
            Self::UpstreamStatus { status, body } => json!({
                "upstream_status": status,
                "upstream_error": body,
            }),
            other => json!({ "detail": other.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_error_bodies() {
        assert_eq!(
            AssistantError::MissingApiKey.to_body(),
            json!({ "detail": "Server is not configured: DASHSCOPE_API_KEY is missing" })
        );
        assert_eq!(
            AssistantError::InvalidJson.to_body(),
            json!({ "detail": "Model did not return valid JSON" })
        );

        let err = AssistantError::UpstreamStatus {
            status: 401,
            body: json!({ "error": { "code": "invalid_api_key" } }),
        };
        assert_eq!(
            err.to_body(),
            json!({
                "upstream_status": 401,
                "upstream_error": { "error": { "code": "invalid_api_key" } },
            })
        );
    }
}

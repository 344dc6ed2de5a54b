//! Catalogue-grounded shopping assistant.
//!
//! A chat turn selects candidate products from the database, asks the
//! upstream model to pick and explain among them, then re-attaches catalogue
//! facts to whatever it picked.
//!
//! # Modules
//!
//! - `client` - [`ChatCompletions`] trait and the `DashScope` implementation
//! - `prompt` - Catalogue block, system prompt, output extraction and merge
//! - `types` - Request validation and response DTOs

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{ChatCompletions, DashScopeClient};
pub use error::AssistantError;
pub use types::{ChatQuery, ChatReply, ChatRequest, Recommendation, UsedFilters};

use crate::models::Product;

/// Throttle scope for the chat endpoint.
pub const THROTTLE_SCOPE: &str = "assistant_chat";

/// Answer a validated query given its candidate products.
///
/// No candidates means a fixed answer and no upstream call.
///
/// # Errors
///
/// Returns an `AssistantError` if the upstream call fails or its output
/// cannot be interpreted.
pub async fn recommend<C>(
    client: &C,
    query: &ChatQuery,
    candidates: &[Product],
) -> Result<ChatReply, AssistantError>
where
    C: ChatCompletions + ?Sized,
{
    let used_filters = UsedFilters::from(query);

    if candidates.is_empty() {
        tracing::info!("No candidates within budget; skipping upstream call");
        return Ok(ChatReply {
            answer: prompt::NO_CANDIDATES_ANSWER.to_string(),
            recommendations: Vec::new(),
            used_filters,
        });
    }

    let messages = prompt::build_messages(query, candidates);
    let upstream = client.complete(messages).await?;
    let payload = prompt::extract_model_json(&upstream)?;
    let (answer, recommendations) = prompt::merge_recommendations(candidates, &payload);

    tracing::info!(
        candidates = candidates.len(),
        recommendations = recommendations.len(),
        "Assistant answered"
    );

    Ok(ChatReply {
        answer,
        recommendations,
        used_filters,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use thinkpad_store_core::{Price, ProductId};

    use super::types::Message;
    use super::*;

    /// Canned upstream that records what it was sent.
    struct MockCompletions {
        reply: Value,
        calls: AtomicUsize,
        last_messages: Mutex<Vec<Message>>,
    }

    impl MockCompletions {
        fn replying(content: &Value) -> Self {
            Self {
                reply: json!({ "choices": [{ "message": { "content": content.to_string() } }] }),
                calls: AtomicUsize::new(0),
                last_messages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatCompletions for MockCompletions {
        async fn complete(&self, messages: Vec<Message>) -> Result<Value, AssistantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_messages.lock().unwrap() = messages;
            Ok(self.reply.clone())
        }
    }

    fn query() -> ChatQuery {
        ChatQuery {
            message: "预算 6000，轻薄办公推荐".to_string(),
            budget_min: None,
            budget_max: Some(rust_decimal::Decimal::new(600_000, 2)),
            limit: 8,
            history: Vec::new(),
        }
    }

    fn x1() -> Product {
        Product {
            id: ProductId::new(1),
            name: "ThinkPad X1".to_string(),
            model: "GenX".to_string(),
            price: Price::parse("5999.00").unwrap(),
            description: "轻薄便携，适合办公与出差。".to_string(),
            stock: 5,
            image: "product_images/placeholder.png".to_string(),
            images: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_no_candidates_skips_upstream() {
        let mock = MockCompletions::replying(&json!({}));

        let reply = recommend(&mock, &query(), &[]).await.unwrap();

        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reply.answer, prompt::NO_CANDIDATES_ANSWER);
        assert!(reply.recommendations.is_empty());
        assert_eq!(reply.used_filters.budget_max.as_deref(), Some("6000.00"));
        assert_eq!(reply.used_filters.limit, 8);
    }

    #[tokio::test]
    async fn test_recommend_fills_catalogue_fields() {
        let mock = MockCompletions::replying(&json!({
            "answer": "我推荐一款轻薄办公本。",
            "recommendations": [{
                "product_id": 1,
                "highlights": ["轻薄", "办公"],
                "tradeoffs": ["不适合重度游戏"],
                "why_fit": "符合预算与便携需求",
            }],
        }));

        let reply = recommend(&mock, &query(), &[x1()]).await.unwrap();

        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
        assert_eq!(reply.answer, "我推荐一款轻薄办公本。");
        assert_eq!(reply.recommendations.len(), 1);
        let first = &reply.recommendations[0];
        assert_eq!(first.name, "ThinkPad X1");
        assert_eq!(first.model, "GenX");
        assert_eq!(first.price, "5999.00");
        assert_eq!(first.stock, 5);
        assert_eq!(first.tradeoffs, vec!["不适合重度游戏".to_string()]);

        let sent = mock.last_messages.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].content.contains("- id: 1; name: ThinkPad X1"));
    }

    #[tokio::test]
    async fn test_upstream_errors_propagate() {
        struct Failing;

        #[async_trait]
        impl ChatCompletions for Failing {
            async fn complete(&self, _: Vec<Message>) -> Result<Value, AssistantError> {
                Err(AssistantError::MissingApiKey)
            }
        }

        let err = recommend(&Failing, &query(), &[x1()]).await.unwrap_err();
        assert!(matches!(err, AssistantError::MissingApiKey));
    }
}

//! Prompt construction and model-output handling.
//!
//! The model only ever sees catalogue facts taken from the database, and its
//! recommendations are filtered back against the same candidate list, so a
//! hallucinated product never reaches the client.

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use super::error::AssistantError;
use super::types::{ChatQuery, MAX_HISTORY_LEN, Message, Recommendation};
use crate::models::Product;

/// Longest product description forwarded to the model.
pub const MAX_DESCRIPTION_CHARS: usize = 400;

/// Reply used when no product matches the filters.
pub const NO_CANDIDATES_ANSWER: &str = "当前商品库中没有符合预算区间的商品。你可以调整预算范围，或告诉我更具体的用途（办公/游戏/剪辑/便携等）。";

/// System prompt pinning the model to the catalogue.
pub const SYSTEM_PROMPT: &str = concat!(
    "你是电脑商城的导购助手。你只能使用 CATALOG 中给出的商品事实（id/name/model/price/stock/description）进行推荐与解释。",
    "如果用户询问的配置细节不在 description 里，必须明确说明‘商品库未提供该配置细节’，不要编造。",
    "请严格输出一个 JSON 对象，不要输出 Markdown/代码块。",
    "recommendations 里只返回来自 CATALOG 的 product_id，并给出简短理由（highlights/tradeoffs/why_fit）。",
);

/// Render the candidate list as the catalogue block of the user turn.
#[must_use]
pub fn catalog_block(candidates: &[Product]) -> String {
    if candidates.is_empty() {
        return "CATALOG is empty.".to_string();
    }

    let mut lines = Vec::with_capacity(candidates.len() + 1);
    lines.push("CATALOG (from database; do not invent fields)".to_string());
    for product in candidates {
        lines.push(format!(
            "- id: {}; name: {}; model: {}; price: {}; stock: {}; description: {}",
            product.id,
            product.name,
            product.model,
            product.price,
            product.stock,
            compact_description(&product.description),
        ));
    }
    lines.join("\n")
}

/// Flatten newlines, trim, and cap the description length.
fn compact_description(description: &str) -> String {
    let flat = description.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() > MAX_DESCRIPTION_CHARS {
        let truncated: String = flat.chars().take(MAX_DESCRIPTION_CHARS).collect();
        format!("{truncated}...")
    } else {
        flat.to_owned()
    }
}

/// Assemble the upstream conversation: system prompt, recent history, then
/// the catalogue plus the question.
#[must_use]
pub fn build_messages(query: &ChatQuery, candidates: &[Product]) -> Vec<Message> {
    let skip = query.history.len().saturating_sub(MAX_HISTORY_LEN);
    let mut messages = Vec::with_capacity(query.history.len() - skip + 2);

    messages.push(Message::new("system", SYSTEM_PROMPT));
    messages.extend(
        query
            .history
            .iter()
            .skip(skip)
            .map(|turn| Message::new(turn.role.as_str(), turn.content.clone())),
    );
    messages.push(Message::new(
        "user",
        format!(
            "{}\n\nUSER_QUESTION: {}",
            catalog_block(candidates),
            query.message
        ),
    ));
    messages
}

/// Structured-output schema requested from the upstream.
#[must_use]
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "assistant_chat_response",
            "schema": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "answer": { "type": "string" },
                    "recommendations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "additionalProperties": false,
                            "properties": {
                                "product_id": { "type": "integer" },
                                "highlights": { "type": "array", "items": { "type": "string" } },
                                "tradeoffs": { "type": "array", "items": { "type": "string" } },
                                "why_fit": { "type": "string" }
                            },
                            "required": ["product_id"]
                        }
                    }
                },
                "required": ["answer", "recommendations"]
            },
            "strict": true
        }
    })
}

/// Pull the model's JSON object out of a chat completions reply.
///
/// # Errors
///
/// - `UnexpectedFormat` when `choices[0].message.content` is missing
/// - `ContentNotString` when the content is neither a string nor an object
/// - `InvalidJson` when the content string is not JSON
pub fn extract_model_json(upstream: &Value) -> Result<Value, AssistantError> {
    let content = upstream
        .pointer("/choices/0/message/content")
        .ok_or(AssistantError::UnexpectedFormat)?;

    match content {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|_| AssistantError::InvalidJson)
        }
        Value::Object(_) => Ok(content.clone()),
        _ => Err(AssistantError::ContentNotString),
    }
}

/// Combine the model's picks with catalogue facts.
///
/// Only recommendations whose integer `product_id` names a candidate survive,
/// first occurrence wins. Returns the answer text and the recommendations.
#[must_use]
pub fn merge_recommendations(
    candidates: &[Product],
    payload: &Value,
) -> (String, Vec<Recommendation>) {
    let answer = payload
        .get("answer")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let empty = Vec::new();
    let picks = payload
        .get("recommendations")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut seen = HashSet::new();
    let mut recommendations = Vec::new();
    for pick in picks.iter().filter_map(Value::as_object) {
        let Some(product_id) = pick
            .get("product_id")
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
        else {
            continue;
        };
        let Some(product) = candidates.iter().find(|p| p.id.as_i32() == product_id) else {
            continue;
        };
        if !seen.insert(product_id) {
            continue;
        }

        recommendations.push(Recommendation {
            product_id,
            name: product.name.clone(),
            model: product.model.clone(),
            price: product.price.to_string(),
            stock: product.stock,
            highlights: string_list(pick, "highlights"),
            tradeoffs: string_list(pick, "tradeoffs"),
            why_fit: pick
                .get("why_fit")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        });
    }

    (answer, recommendations)
}

/// String entries of a list field; anything else yields an empty list.
/// Scalars are kept as text (`7` becomes `"7"`); nulls and nested values are dropped.
fn string_list(pick: &Map<String, Value>, key: &str) -> Vec<String> {
    pick.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Number(number) => Some(number.to_string()),
                    Value::Bool(flag) => Some(flag.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use thinkpad_store_core::{Price, ProductId};

    use super::*;
    use crate::assistant::types::{HistoryMessage, Role};

    fn product(id: i32, name: &str, price: &str, stock: i32, description: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            model: "GenX".to_string(),
            price: Price::parse(price).unwrap(),
            description: description.to_string(),
            stock,
            image: String::new(),
            images: Vec::new(),
        }
    }

    fn query(history: Vec<HistoryMessage>) -> ChatQuery {
        ChatQuery {
            message: "预算 6000，轻薄办公推荐".to_string(),
            budget_min: None,
            budget_max: None,
            limit: 8,
            history,
        }
    }

    #[test]
    fn test_catalog_block_lines() {
        let block = catalog_block(&[product(1, "ThinkPad X1", "5999", 5, "轻薄\n便携  ")]);
        assert_eq!(
            block,
            "CATALOG (from database; do not invent fields)\n\
             - id: 1; name: ThinkPad X1; model: GenX; price: 5999.00; stock: 5; description: 轻薄 便携"
        );
        assert_eq!(catalog_block(&[]), "CATALOG is empty.");
    }

    #[test]
    fn test_long_description_is_truncated() {
        let long = "长".repeat(450);
        let block = catalog_block(&[product(1, "P1", "1", 1, &long)]);
        let description = block.rsplit("description: ").next().unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS + 3);
        assert!(description.ends_with("..."));
    }

    #[test]
    fn test_build_messages_layout() {
        let history = vec![
            HistoryMessage { role: Role::User, content: "你好".to_string() },
            HistoryMessage { role: Role::Assistant, content: "请说预算".to_string() },
        ];
        let messages = build_messages(&query(history), &[product(1, "X1", "5999", 5, "")]);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1], Message::new("user", "你好"));
        assert_eq!(messages[2], Message::new("assistant", "请说预算"));
        assert_eq!(messages[3].role, "user");
        assert!(messages[3].content.starts_with("CATALOG (from database"));
        assert!(messages[3].content.ends_with("\n\nUSER_QUESTION: 预算 6000，轻薄办公推荐"));
    }

    #[test]
    fn test_response_format_is_strict_schema() {
        let format = response_format();
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "assistant_chat_response");
        assert_eq!(format["json_schema"]["strict"], true);
    }

    #[test]
    fn test_extract_model_json() {
        let upstream = json!({ "choices": [{ "message": { "content": "{\"answer\": \"ok\"}" } }] });
        assert_eq!(extract_model_json(&upstream).unwrap(), json!({ "answer": "ok" }));

        let structured = json!({ "choices": [{ "message": { "content": { "answer": "ok" } } }] });
        assert_eq!(extract_model_json(&structured).unwrap(), json!({ "answer": "ok" }));
    }

    #[test]
    fn test_extract_model_json_errors() {
        assert!(matches!(
            extract_model_json(&json!({ "choices": [] })),
            Err(AssistantError::UnexpectedFormat)
        ));
        assert!(matches!(
            extract_model_json(&json!({ "choices": [{ "message": { "content": 3 } }] })),
            Err(AssistantError::ContentNotString)
        ));
        assert!(matches!(
            extract_model_json(&json!({ "choices": [{ "message": { "content": "not json" } }] })),
            Err(AssistantError::InvalidJson)
        ));
    }

    #[test]
    fn test_merge_keeps_known_unique_products() {
        let candidates = [product(1, "X1", "5999", 5, ""), product(2, "P1", "12999", 2, "")];
        let payload = json!({
            "answer": "推荐 X1",
            "recommendations": [
                { "product_id": 1, "highlights": ["轻薄", 7, 1.5, null, ["nested"]], "why_fit": "便携" },
                { "product_id": 1, "why_fit": "duplicate" },
                { "product_id": 99 },
                { "product_id": "2" },
                "junk",
                { "product_id": 2, "tradeoffs": "not a list", "why_fit": 5 },
            ],
        });

        let (answer, recs) = merge_recommendations(&candidates, &payload);
        assert_eq!(answer, "推荐 X1");
        assert_eq!(recs.len(), 2);

        assert_eq!(recs[0].product_id, 1);
        assert_eq!(recs[0].name, "X1");
        assert_eq!(recs[0].price, "5999.00");
        assert_eq!(recs[0].stock, 5);
        assert_eq!(recs[0].highlights, ["轻薄", "7", "1.5"]);
        assert_eq!(recs[0].why_fit, "便携");

        assert_eq!(recs[1].product_id, 2);
        assert!(recs[1].tradeoffs.is_empty());
        assert_eq!(recs[1].why_fit, "");
    }

    #[test]
    fn test_merge_non_string_answer() {
        let (answer, recs) = merge_recommendations(&[], &json!({ "answer": 42 }));
        assert_eq!(answer, "");
        assert!(recs.is_empty());
    }
}

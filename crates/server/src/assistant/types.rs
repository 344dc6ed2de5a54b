//! Request, response and upstream wire types for the shopping assistant.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use thinkpad_store_core::{Price, parse_decimal_field};

use crate::error::{NON_FIELD_ERRORS, ValidationErrors};

/// Longest accepted user message.
pub const MAX_MESSAGE_CHARS: usize = 2000;
/// Longest accepted history entry.
pub const MAX_HISTORY_CONTENT_CHARS: usize = 1000;
/// Most history entries accepted and forwarded upstream.
pub const MAX_HISTORY_LEN: usize = 6;
/// Default and maximum number of candidates.
pub const DEFAULT_LIMIT: u8 = 8;
pub const MAX_LIMIT: u8 = 20;

// =============================================================================
// Request
// =============================================================================

/// Chat request body as sent by clients, before validation.
///
/// Fields are kept loose so every problem can be reported per field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The shopper's question (1-2000 characters).
    #[schema(value_type = String)]
    pub message: Option<Value>,
    /// Lower price bound, e.g. `"3000.00"`.
    #[schema(value_type = Option<String>)]
    pub budget_min: Option<Value>,
    /// Upper price bound, e.g. `"6000.00"`.
    #[schema(value_type = Option<String>)]
    pub budget_max: Option<Value>,
    /// Number of catalogue candidates (1-20, default 8).
    #[schema(value_type = Option<u8>)]
    pub limit: Option<Value>,
    /// Up to six previous turns.
    #[schema(value_type = Option<Vec<HistoryMessage>>)]
    pub history: Option<Value>,
}

/// Speaker of a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn parse(value: Option<&Value>) -> Option<Self> {
        match value.and_then(Value::as_str) {
            Some("user") => Some(Self::User),
            Some("assistant") => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One earlier turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

/// A validated chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatQuery {
    pub message: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub limit: u8,
    pub history: Vec<HistoryMessage>,
}

impl ChatQuery {
    /// Validate a raw request, collecting every problem by field.
    ///
    /// # Errors
    ///
    /// Returns the field → messages map when any field is invalid.
    pub fn validate(request: ChatRequest) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let message = validate_message(request.message.as_ref(), &mut errors);
        let budget_min = validate_budget("budget_min", request.budget_min.as_ref(), &mut errors);
        let budget_max = validate_budget("budget_max", request.budget_max.as_ref(), &mut errors);
        let limit = validate_limit(request.limit.as_ref(), &mut errors);
        let history = validate_history(request.history.as_ref(), &mut errors);

        if let (Some(min), Some(max)) = (budget_min, budget_max)
            && min > max
        {
            errors.add(NON_FIELD_ERRORS, "budget_min cannot be greater than budget_max");
        }

        errors.into_result()?;

        Ok(Self {
            message: message.unwrap_or_default(),
            budget_min,
            budget_max,
            limit,
            history,
        })
    }
}

fn validate_message(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<String> {
    let raw = match value {
        None => {
            errors.add("message", "This field is required.");
            return None;
        }
        Some(Value::Null) => {
            errors.add("message", "This field may not be null.");
            return None;
        }
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add("message", "Not a valid string.");
            return None;
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.add("message", "This field may not be blank.");
        return None;
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        errors.add(
            "message",
            format!("Ensure this field has no more than {MAX_MESSAGE_CHARS} characters."),
        );
        return None;
    }
    Some(trimmed.to_owned())
}

fn validate_budget(
    field: &str,
    value: Option<&Value>,
    errors: &mut ValidationErrors,
) -> Option<Decimal> {
    let raw = match value {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add(field, "A valid number is required.");
            return None;
        }
    };

    parse_decimal_field(&raw, Price::MAX_DIGITS, Price::DECIMAL_PLACES)
        .map_err(|e| errors.add(field, e.to_string()))
        .ok()
}

fn validate_limit(value: Option<&Value>, errors: &mut ValidationErrors) -> u8 {
    let parsed = match value {
        None => return DEFAULT_LIMIT,
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    match parsed {
        None => {
            errors.add("limit", "A valid integer is required.");
            DEFAULT_LIMIT
        }
        Some(n) if n < 1 => {
            errors.add("limit", "Ensure this value is greater than or equal to 1.");
            DEFAULT_LIMIT
        }
        Some(n) if n > i64::from(MAX_LIMIT) => {
            errors.add(
                "limit",
                format!("Ensure this value is less than or equal to {MAX_LIMIT}."),
            );
            DEFAULT_LIMIT
        }
        Some(n) => u8::try_from(n).unwrap_or(DEFAULT_LIMIT),
    }
}

fn validate_history(value: Option<&Value>, errors: &mut ValidationErrors) -> Vec<HistoryMessage> {
    let items = match value {
        None => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            errors.add(
                "history",
                format!(
                    "Expected a list of items but got type \"{}\".",
                    json_type_name(other)
                ),
            );
            return Vec::new();
        }
    };

    if items.len() > MAX_HISTORY_LEN {
        errors.add(
            "history",
            format!("Ensure this field has no more than {MAX_HISTORY_LEN} elements."),
        );
        return Vec::new();
    }

    let mut history = Vec::with_capacity(items.len());
    for item in items {
        let Some(object) = item.as_object() else {
            errors.add(
                "history",
                format!(
                    "Expected a dictionary of items but got type \"{}\".",
                    json_type_name(item)
                ),
            );
            return Vec::new();
        };

        let Some(role) = Role::parse(object.get("role")) else {
            errors.add("history", "history.role must be 'user' or 'assistant'");
            return Vec::new();
        };

        let content = match object.get("content").and_then(Value::as_str) {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                errors.add("history", "history.content must be a non-empty string");
                return Vec::new();
            }
        };
        if content.chars().count() > MAX_HISTORY_CONTENT_CHARS {
            errors.add("history", "history.content too long");
            return Vec::new();
        }

        history.push(HistoryMessage {
            role,
            content: content.trim().to_owned(),
        });
    }
    history
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

// =============================================================================
// Response
// =============================================================================

/// Filters actually applied when choosing candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UsedFilters {
    pub budget_min: Option<String>,
    pub budget_max: Option<String>,
    pub limit: u8,
}

impl From<&ChatQuery> for UsedFilters {
    fn from(query: &ChatQuery) -> Self {
        Self {
            budget_min: query.budget_min.map(|d| d.to_string()),
            budget_max: query.budget_max.map(|d| d.to_string()),
            limit: query.limit,
        }
    }
}

/// A recommended product. Catalogue fields come from the database, the
/// reasoning fields from the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    pub product_id: i32,
    pub name: String,
    pub model: String,
    pub price: String,
    pub stock: i32,
    pub highlights: Vec<String>,
    pub tradeoffs: Vec<String>,
    pub why_fit: String,
}

/// Assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    pub answer: String,
    pub recommendations: Vec<Recommendation>,
    pub used_filters: UsedFilters,
}

// =============================================================================
// Upstream Wire Types
// =============================================================================

/// A message sent to the chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_owned(),
            content: content.into(),
        }
    }
}

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
    pub response_format: Value,
}

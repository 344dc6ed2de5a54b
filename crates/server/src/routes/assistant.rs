//! Shopping assistant chat endpoint.

use axum::{Json, Router, extract::State, routing::post};
use tracing::instrument;

use crate::assistant::{self, ChatQuery, ChatReply, ChatRequest};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::{ClientAddr, OptionalAuth, ThrottleKey};
use crate::state::AppState;

/// Build the assistant router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/assistant/chat/", post(chat))
}

/// Ask for product recommendations grounded in the catalogue.
///
/// Anonymous access is allowed. Requests are throttled per user when
/// authenticated and per client IP otherwise.
#[utoipa::path(
    post,
    path = "/assistant/chat/",
    tag = "assistant",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Answer and recommendations", body = ChatReply),
        (status = 400, description = "Field errors, missing API key or upstream failure"),
        (status = 429, description = "Request was throttled."),
    )
)]
#[instrument(skip(state, user, client, body))]
pub async fn chat(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ClientAddr(client): ClientAddr,
    ApiJson(body): ApiJson<ChatRequest>,
) -> Result<Json<ChatReply>> {
    let key = match (&user, client) {
        (Some(user), _) => ThrottleKey::User(user.id.as_i32()),
        (None, Some(ip)) => ThrottleKey::Ip(ip),
        (None, None) => ThrottleKey::Anonymous,
    };
    if !state.chat_throttle().check(&key) {
        return Err(AppError::RateLimited);
    }

    let query = ChatQuery::validate(body)?;
    let candidates = ProductRepository::new(state.pool())
        .candidates(query.budget_min, query.budget_max, query.limit)
        .await?;

    tracing::info!(
        throttle_key = %key,
        candidates = candidates.len(),
        history = query.history.len(),
        "Assistant chat"
    );

    let reply = assistant::recommend(state.assistant(), &query, &candidates).await?;
    Ok(Json(reply))
}

//! ThinkPad Store API server library.
//!
//! This crate provides the JSON API as a library so the server binary, the
//! `ts-cli runserver` command and the tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assistant;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};

use config::StoreConfig;
use state::AppState;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("media storage: {0}")]
    Media(std::io::Error),

    #[error("assistant client: {0}")]
    Assistant(#[from] assistant::AssistantError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Build the full application router, layers included.
pub fn app(state: AppState) -> Router {
    let media = state.media();
    let media_prefix = media.url_prefix().trim_end_matches('/').to_owned();
    let media_root = media.root().to_path_buf();

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes());

    if !media_prefix.is_empty() {
        router = router.nest_service(&media_prefix, ServeDir::new(media_root));
    }

    router
        .with_state(state)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_id::make_request_span::<Body>))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Connect to the database and serve the API until a shutdown signal.
///
/// # Errors
///
/// Returns `ServeError` if the database, media root, assistant client or
/// listener cannot be set up, or if the server fails while running.
pub async fn serve(config: StoreConfig) -> Result<(), ServeError> {
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: ts-cli migrate

    let addr = config.socket_addr();
    let state = AppState::new(config, pool)?;
    state
        .media()
        .ensure_placeholder()
        .await
        .map_err(ServeError::Media)?;

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!("thinkpad store listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(ServeError::Serve)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

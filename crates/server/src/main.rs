//! ThinkPad Store API server.
//!
//! Serves the JSON API on `STORE_HOST:STORE_PORT` (default 127.0.0.1:8000).
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` (sqlx) for users, carts, products and promotions
//! - JWT bearer authentication
//! - `DashScope` (OpenAI-compatible) upstream for the shopping assistant
//! - OpenAPI document and Swagger UI under `/swagger/`
//!
//! Migrations are applied with `ts-cli migrate`, never on startup.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use thinkpad_store_server::config::StoreConfig;
use thinkpad_store_server::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present (ignore errors if missing)
    let _ = dotenvy::dotenv();

    // Load configuration from environment (needed for Sentry init)
    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(telemetry::DEFAULT_LOG_FILTER);

    if let Err(e) = thinkpad_store_server::serve(config).await {
        tracing::error!(error = %e, "Server stopped");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

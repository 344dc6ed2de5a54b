//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::assistant::{self, AssistantError, ChatCompletions, DashScopeClient};
use crate::config::StoreConfig;
use crate::middleware::rate_limit::ChatThrottle;
use crate::services::auth::JwtIssuer;
use crate::services::media::MediaStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StoreConfig,
    pool: PgPool,
    jwt: JwtIssuer,
    media: MediaStore,
    assistant: Arc<dyn ChatCompletions>,
    chat_throttle: ChatThrottle,
}

impl AppState {
    /// Create a new application state backed by the `DashScope` client.
    ///
    /// # Arguments
    ///
    /// * `config` - Store configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the assistant HTTP client cannot be built.
    pub fn new(config: StoreConfig, pool: PgPool) -> Result<Self, AssistantError> {
        let client = DashScopeClient::new(&config.assistant)?;
        Ok(Self::with_assistant(config, pool, Arc::new(client)))
    }

    /// Create a new application state with a specific chat completions backend.
    #[must_use]
    pub fn with_assistant(
        config: StoreConfig,
        pool: PgPool,
        assistant: Arc<dyn ChatCompletions>,
    ) -> Self {
        let jwt = JwtIssuer::new(&config.jwt);
        let media = MediaStore::new(&config.media);
        let chat_throttle =
            ChatThrottle::new(assistant::THROTTLE_SCOPE, config.assistant.chat_rate);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                media,
                assistant,
                chat_throttle,
            }),
        }
    }

    /// Get a reference to the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the JWT issuer.
    #[must_use]
    pub fn jwt(&self) -> &JwtIssuer {
        &self.inner.jwt
    }

    /// Get a reference to the media store.
    #[must_use]
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    /// Get the chat completions backend.
    #[must_use]
    pub fn assistant(&self) -> &dyn ChatCompletions {
        self.inner.assistant.as_ref()
    }

    /// Get the assistant chat throttle.
    #[must_use]
    pub fn chat_throttle(&self) -> &ChatThrottle {
        &self.inner.chat_throttle
    }
}

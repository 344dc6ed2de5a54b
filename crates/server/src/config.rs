//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STORE_JWT_SECRET` - HMAC secret for signing tokens (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STORE_HOST` - Bind address (default: 127.0.0.1)
//! - `STORE_PORT` - Listen port (default: 8000)
//! - `STORE_ACCESS_TOKEN_TTL_SECS` - Access token lifetime (default: 300)
//! - `STORE_REFRESH_TOKEN_TTL_SECS` - Refresh token lifetime (default: 86400)
//! - `STORE_MEDIA_ROOT` - Directory holding uploaded images (default: media)
//! - `STORE_MEDIA_URL` - URL prefix media is served under (default: /media/)
//! - `DASHSCOPE_API_KEY` - API key for the shopping assistant upstream
//! - `DASHSCOPE_BASE_URL` - OpenAI-compatible base URL
//! - `ASSISTANT_MODEL` - Upstream model name (default: qwen-plus)
//! - `ASSISTANT_TIMEOUT_SECS` - Upstream request timeout (default: 45)
//! - `ASSISTANT_CHAT_RATE` - Assistant throttle, e.g. `10/minute` (default)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::middleware::rate_limit::ThrottleRate;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default upstream for the shopping assistant.
pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Uploaded media location
    pub media: MediaConfig,
    /// Shopping assistant upstream configuration
    pub assistant: AssistantConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// JWT signing configuration.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 signing secret
    pub secret: SecretString,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Where uploaded product images live and how they are addressed.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Filesystem directory
    pub root: PathBuf,
    /// URL prefix, always starting and ending with `/`
    pub url: String,
}

/// Shopping assistant upstream configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AssistantConfig {
    /// `DashScope` API key. Absent keys are reported per request, not at startup.
    pub api_key: Option<SecretString>,
    /// OpenAI-compatible base URL
    pub base_url: Url,
    /// Model name sent upstream
    pub model: String,
    /// Upstream request timeout
    pub timeout: Duration,
    /// Throttle applied to the chat endpoint
    pub chat_rate: ThrottleRate,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("chat_rate", &self.chat_rate)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StoreConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let database_url = env
            .optional("STORE_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STORE_DATABASE_URL".to_string()))?;
        let host = env.parsed::<IpAddr>("STORE_HOST", "127.0.0.1")?;
        let port = env.parsed::<u16>("STORE_PORT", "8000")?;

        let jwt_secret = env.required("STORE_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "STORE_JWT_SECRET")?;
        let jwt = JwtConfig {
            secret: SecretString::from(jwt_secret),
            access_ttl: Duration::from_secs(env.parsed("STORE_ACCESS_TOKEN_TTL_SECS", "300")?),
            refresh_ttl: Duration::from_secs(
                env.parsed("STORE_REFRESH_TOKEN_TTL_SECS", "86400")?,
            ),
        };

        let media = MediaConfig {
            root: PathBuf::from(env.or_default("STORE_MEDIA_ROOT", "media")),
            url: normalize_media_url(&env.or_default("STORE_MEDIA_URL", "/media/")),
        };

        let base_url = env.or_default("DASHSCOPE_BASE_URL", DEFAULT_DASHSCOPE_BASE_URL);
        let assistant = AssistantConfig {
            api_key: env
                .optional("DASHSCOPE_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from),
            base_url: Url::parse(&base_url).map_err(|e| {
                ConfigError::InvalidEnvVar("DASHSCOPE_BASE_URL".to_string(), e.to_string())
            })?,
            model: env.or_default("ASSISTANT_MODEL", "qwen-plus"),
            timeout: Duration::from_secs(env.parsed("ASSISTANT_TIMEOUT_SECS", "45")?),
            chat_rate: env.parsed("ASSISTANT_CHAT_RATE", "10/minute")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            media,
            assistant,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Override the bind address (used by `runserver <addr>`).
    #[must_use]
    pub const fn with_socket_addr(mut self, addr: SocketAddr) -> Self {
        self.host = addr.ip();
        self.port = addr.port();
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Thin wrapper over the variable lookup with typed accessors.
struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Ensure the media URL prefix starts and ends with a slash.
fn normalize_media_url(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that the signing secret is long, not a placeholder, and has
/// sufficient entropy.
fn validate_jwt_secret(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Expose the signing secret bytes.
impl JwtConfig {
    #[must_use]
    pub fn secret_bytes(&self) -> &[u8] {
        self.secret.expose_secret().as_bytes()
    }
}

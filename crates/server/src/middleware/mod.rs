//! HTTP middleware and extractors for the API server.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on registration and login (governor)
//!
//! Authentication is not a layer: handlers opt in through the
//! [`RequireAuth`], [`OptionalAuth`] and [`RequireSuperuser`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{OptionalAuth, RequireAuth, RequireSuperuser};
pub use rate_limit::{
    ChatThrottle, ClientAddr, ThrottleKey, ThrottleRate, auth_rate_limiter, client_ip,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};

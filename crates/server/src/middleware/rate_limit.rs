//! Rate limiting using governor and `tower_governor`.
//!
//! Two mechanisms live here:
//! - `auth_rate_limiter`: a per-IP tower layer in front of registration and login
//! - [`ChatThrottle`]: a keyed sliding-window limiter for the assistant,
//!   consulted inside the handler because its key depends on who is
//!   authenticated

use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, Request, request::Parts};
use dashmap::DashMap;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Resolution
// =============================================================================

/// Resolve the client IP from proxy headers, falling back to the peer address.
///
/// `X-Forwarded-For` (first hop) wins over `X-Real-IP`.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    peer.map(|addr| addr.ip())
}

/// Key extractor that reads proxy headers first, then the socket peer.
///
/// The peer is only available when the server is started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        client_ip(req.headers(), peer).ok_or(GovernorError::UnableToExtractKey)
    }
}

/// The resolved client IP of a request, if any.
///
/// Never rejects: requests served without connect info and without proxy
/// headers simply have no address.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(client_ip(&parts.headers, peer)))
    }
}

// =============================================================================
// Auth Endpoint Limiter
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(6)` and `burst_size(5)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6) // Replenish 1 token every 6 seconds (~10/minute)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

// =============================================================================
// Throttle Rates
// =============================================================================

/// Error parsing a [`ThrottleRate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThrottleRateError {
    #[error("expected '<count>/<period>', got '{0}'")]
    Format(String),
    #[error("request count must be a positive integer, got '{0}'")]
    Count(String),
    #[error("unknown period '{0}' (use second, minute, hour or day)")]
    Period(String),
}

/// A request budget such as `10/minute`.
///
/// Periods are matched on their first letter, so `10/min`, `10/m` and
/// `10/minute` are equivalent.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ThrottleRate {
    requests: NonZeroU32,
    period: Duration,
}

impl ThrottleRate {
    /// Requests allowed per period.
    #[must_use]
    pub const fn requests(&self) -> NonZeroU32 {
        self.requests
    }

    /// Length of the window.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

impl FromStr for ThrottleRate {
    type Err = ThrottleRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (count, period) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| ThrottleRateError::Format(s.to_string()))?;

        let requests = count
            .trim()
            .parse::<NonZeroU32>()
            .map_err(|_| ThrottleRateError::Count(count.to_string()))?;

        let period = match period.trim().chars().next() {
            Some('s') => Duration::from_secs(1),
            Some('m') => Duration::from_secs(60),
            Some('h') => Duration::from_secs(3_600),
            Some('d') => Duration::from_secs(86_400),
            _ => return Err(ThrottleRateError::Period(period.to_string())),
        };

        Ok(Self { requests, period })
    }
}

impl fmt::Debug for ThrottleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}s", self.requests, self.period.as_secs())
    }
}

// =============================================================================
// Keyed Chat Throttle
// =============================================================================

/// Identity a throttled request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ThrottleKey {
    User(i32),
    Ip(IpAddr),
    /// No identity could be resolved; all such requests share a bucket.
    Anonymous,
}

impl fmt::Display for ThrottleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Ip(ip) => write!(f, "ip:{ip}"),
            Self::Anonymous => f.write_str("ip:unknown"),
        }
    }
}

/// Per-scope keyed limiter shared through `AppState`.
///
/// Each key keeps the timestamps of its recent requests; a request is allowed
/// while fewer than `requests` of them fall inside the trailing `period`.
pub struct ChatThrottle {
    scope: &'static str,
    rate: ThrottleRate,
    history: DashMap<String, VecDeque<Instant>>,
}

impl ChatThrottle {
    /// Create a throttle for `scope` with the given rate.
    #[must_use]
    pub fn new(scope: &'static str, rate: ThrottleRate) -> Self {
        Self {
            scope,
            rate,
            history: DashMap::new(),
        }
    }

    /// Record a request for `key`, returning `false` once the budget is spent.
    pub fn check(&self, key: &ThrottleKey) -> bool {
        self.check_at(key, Instant::now())
    }

    /// [`check`](Self::check) against an explicit clock reading.
    pub fn check_at(&self, key: &ThrottleKey, now: Instant) -> bool {
        let period = self.rate.period();
        let limit = usize::try_from(self.rate.requests().get()).unwrap_or(usize::MAX);
        let cache_key = format!("throttle_{}_{key}", self.scope);

        let allowed = {
            let mut history = self.history.entry(cache_key).or_default();
            while history
                .front()
                .is_some_and(|seen| now.saturating_duration_since(*seen) >= period)
            {
                history.pop_front();
            }
            if history.len() < limit {
                history.push_back(now);
                true
            } else {
                false
            }
        };

        if !allowed {
            tracing::debug!(scope = self.scope, key = %key, "Request throttled");
        }
        self.history.retain(|_, history| {
            history
                .back()
                .is_some_and(|seen| now.saturating_duration_since(*seen) < period)
        });
        allowed
    }
}

impl fmt::Debug for ChatThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatThrottle")
            .field("scope", &self.scope)
            .field("rate", &self.rate)
            .field("tracked_keys", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_throttle_rate() {
        let rate: ThrottleRate = "10/minute".parse().unwrap();
        assert_eq!(rate.requests().get(), 10);
        assert_eq!(rate.period(), Duration::from_secs(60));

        let rate: ThrottleRate = "3/s".parse().unwrap();
        assert_eq!(rate.period(), Duration::from_secs(1));

        let rate: ThrottleRate = " 100 / day ".parse().unwrap();
        assert_eq!(rate.requests().get(), 100);
        assert_eq!(rate.period(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_parse_throttle_rate_errors() {
        assert!(matches!(
            "ten".parse::<ThrottleRate>(),
            Err(ThrottleRateError::Format(_))
        ));
        assert!(matches!(
            "0/minute".parse::<ThrottleRate>(),
            Err(ThrottleRateError::Count(_))
        ));
        assert!(matches!(
            "5/fortnight".parse::<ThrottleRate>(),
            Err(ThrottleRateError::Period(_))
        ));
    }

    #[test]
    fn test_throttle_key_display() {
        assert_eq!(ThrottleKey::User(7).to_string(), "user:7");
        assert_eq!(
            ThrottleKey::Ip("10.0.0.1".parse().unwrap()).to_string(),
            "ip:10.0.0.1"
        );
    }

    #[test]
    fn test_chat_throttle_blocks_after_budget() {
        let throttle = ChatThrottle::new("assistant_chat", "2/minute".parse().unwrap());
        let alice = ThrottleKey::User(1);
        let bob = ThrottleKey::User(2);

        assert!(throttle.check(&alice));
        assert!(throttle.check(&alice));
        assert!(!throttle.check(&alice));

        // Separate identities have separate budgets
        assert!(throttle.check(&bob));
    }

    #[test]
    fn test_chat_throttle_never_exceeds_rate_within_window() {
        let throttle = ChatThrottle::new("assistant_chat", "2/second".parse().unwrap());
        let key = ThrottleKey::Ip("10.0.0.1".parse().unwrap());
        let start = Instant::now();

        let allowed = (0..90)
            .map(|tick| start + Duration::from_millis(tick * 10))
            .filter(|&now| throttle.check_at(&key, now))
            .count();
        assert_eq!(allowed, 2);
    }

    #[test]
    fn test_chat_throttle_slides_with_oldest_request() {
        let throttle = ChatThrottle::new("assistant_chat", "2/second".parse().unwrap());
        let key = ThrottleKey::User(9);
        let start = Instant::now();

        assert!(throttle.check_at(&key, start));
        assert!(throttle.check_at(&key, start + Duration::from_millis(600)));
        assert!(!throttle.check_at(&key, start + Duration::from_millis(900)));

        // The first request has aged out; the second still counts
        assert!(throttle.check_at(&key, start + Duration::from_millis(1_000)));
        assert!(!throttle.check_at(&key, start + Duration::from_millis(1_500)));
        assert!(throttle.check_at(&key, start + Duration::from_millis(1_600)));
    }

    #[test]
    fn test_chat_throttle_forgets_idle_keys() {
        let throttle = ChatThrottle::new("assistant_chat", "1/second".parse().unwrap());
        let start = Instant::now();

        assert!(throttle.check_at(&ThrottleKey::User(1), start));
        assert!(throttle.check_at(&ThrottleKey::User(2), start + Duration::from_secs(2)));
        assert_eq!(throttle.history.len(), 1);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.44:5000".parse().unwrap();

        assert_eq!(
            client_ip(&headers, Some(peer)),
            Some("192.0.2.44".parse().unwrap())
        );
        assert_eq!(client_ip(&headers, None), None);
    }
}

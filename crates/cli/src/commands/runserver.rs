//! Start the API server.
//!
//! # Usage
//!
//! ```bash
//! ts-cli runserver                 # 127.0.0.1:8000 (or STORE_HOST/STORE_PORT)
//! ts-cli runserver 8080            # 127.0.0.1:8080
//! ts-cli runserver 0.0.0.0:8000
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;

use thinkpad_store_server::config::{ConfigError, StoreConfig};
use thinkpad_store_server::{ServeError, telemetry};

#[derive(Debug, Error)]
pub enum RunServerError {
    #[error("Invalid address {0:?}: expected PORT or HOST:PORT")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Serve(#[from] ServeError),
}

/// Parse `PORT` or `HOST:PORT`. A bare port binds the loopback address.
///
/// # Errors
///
/// Returns `RunServerError::InvalidAddress` for anything else.
pub fn parse_address(address: &str) -> Result<SocketAddr, RunServerError> {
    let address = address.trim();
    if let Ok(port) = address.parse::<u16>() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port));
    }
    address
        .parse()
        .map_err(|_| RunServerError::InvalidAddress(address.to_owned()))
}

/// Load configuration and serve until shutdown.
///
/// # Errors
///
/// Returns `RunServerError` if the address or configuration is invalid, or
/// the server fails.
pub async fn run(address: Option<&str>) -> Result<(), RunServerError> {
    let override_addr = address.map(parse_address).transpose()?;

    dotenvy::dotenv().ok();
    let mut config = StoreConfig::from_env()?;
    if let Some(addr) = override_addr {
        config = config.with_socket_addr(addr);
    }

    let _sentry_guard = telemetry::init_sentry(&config);
    thinkpad_store_server::serve(config).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_port() {
        assert_eq!(
            parse_address("8080").unwrap().to_string(),
            "127.0.0.1:8080"
        );
    }

    #[test]
    fn test_host_and_port() {
        assert_eq!(
            parse_address("0.0.0.0:9000").unwrap().to_string(),
            "0.0.0.0:9000"
        );
        assert_eq!(parse_address("[::1]:8000").unwrap().port(), 8000);
    }

    #[test]
    fn test_invalid_address() {
        for bad in ["", "localhost", "127.0.0.1", "1.2.3.4:99999", "70000"] {
            assert!(
                matches!(parse_address(bad), Err(RunServerError::InvalidAddress(_))),
                "{bad}"
            );
        }
    }
}

//! Server configuration for the gateway.
//!
//! Loads configuration from environment variables with development defaults.

use std::net::SocketAddr;

use baogate_upstream::DEFAULT_ADDR;

const DEFAULT_PORT: u16 = 3000;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Base address of the upstream OpenBao server, without a trailing `/`.
    pub upstream_addr: String,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `BAOGATE_BIND_ADDR`: full bind address (default: `127.0.0.1:3000`)
    /// - `PORT`: port to bind on all interfaces, used when `BAOGATE_BIND_ADDR` is unset
    /// - `OPENBAO_ADDR`: upstream server address (default: `http://localhost:8200`)
    /// - `BAOGATE_LOG_LEVEL`: log filter (default: `info`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let default_bind = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));

        // Priority: BAOGATE_BIND_ADDR > PORT > default.
        let bind_addr = if let Some(addr) = get("BAOGATE_BIND_ADDR") {
            addr.parse().unwrap_or(default_bind)
        } else if let Some(port) = get("PORT") {
            SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(DEFAULT_PORT)))
        } else {
            default_bind
        };

        let upstream_addr = get("OPENBAO_ADDR")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ADDR.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let log_level = get("BAOGATE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        Self {
            bind_addr,
            upstream_addr,
            log_level,
        }
    }
}

//! Shared application state for the gateway.
//!
//! A single [`AppState`] is built at startup and shared across handlers via
//! `Arc`. It only holds the upstream handle; per-caller clients are created
//! on demand and dropped with the request.

use baogate_upstream::{OpenBaoClient, Upstream};

use crate::middleware::CallerToken;

/// Shared application state passed to all HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pooled connection to the upstream server.
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// An upstream client bound to the caller's token for this request.
    pub fn client_for(&self, token: &CallerToken) -> OpenBaoClient {
        self.upstream.bind(token.as_str())
    }
}

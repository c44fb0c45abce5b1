//! Baogate HTTP gateway.
//!
//! Exposes a small JSON API under `/api/*` for the admin console and relays
//! each call to the upstream OpenBao server with the caller's token. The
//! gateway keeps no session state: the token arrives in a header on every
//! request, is forwarded as-is, and is forgotten when the response is sent.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use routes::build_router;

//! HTTP route handlers for the gateway.
//!
//! Routes are organized by resource:
//! - `auth`: Login (token or userpass), outside the token check
//! - `secrets`: KV v2 folder listing and leaf read/write/delete
//! - `users`: Userpass account management
//! - `policies`: Read-only policy listing
//!
//! Everything except login and `/health` sits behind
//! [`require_token`](crate::middleware::require_token).

pub mod auth;
pub mod policies;
pub mod secrets;
pub mod users;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use axum::{Json, Router, middleware as axum_mw};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use baogate_core::GATEWAY_TOKEN_HEADER;

use crate::middleware::require_token;
use crate::state::AppState;

/// `{"success": true}`, returned by deletes.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Liveness of the gateway process itself. Never touches the upstream.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Build the full gateway router with middleware and response headers.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(secrets::router())
        .merge(users::router())
        .merge(policies::router())
        .route_layer(axum_mw::from_fn(require_token));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(GATEWAY_TOKEN_HEADER),
        ]);

    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

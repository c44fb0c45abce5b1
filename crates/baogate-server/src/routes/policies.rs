//! Policy routes: `/api/policies` and `/api/policies/{name}`
//!
//! Read-only. Rule bodies are passed through as opaque text.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Extension, Json, Router};

use baogate_upstream::{KeyListResponse, PolicyResponse};

use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::state::AppState;

/// Build the policies router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/policies", get(list_policies))
        .route("/api/policies/{name}", get(get_policy))
}

async fn list_policies(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
) -> Result<Json<KeyListResponse>, AppError> {
    let names = state.client_for(&token).list_policies().await?;
    Ok(Json(names))
}

async fn get_policy(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(name): Path<String>,
) -> Result<Json<PolicyResponse>, AppError> {
    let policy = state.client_for(&token).get_policy(&name).await?;
    Ok(Json(policy))
}

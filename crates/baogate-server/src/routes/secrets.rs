//! Secrets routes: `/api/secrets` and `/api/secrets/{*path}`
//!
//! Listing takes the folder to list as `?path=` (empty for the root) and
//! passes the upstream envelope through unchanged. Leaf paths may be nested
//! (`/api/secrets/app/db`) or percent-encoded (`/api/secrets/app%2Fdb`).
//! Create and update are the same upstream write.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;

use baogate_upstream::{KeyListResponse, KvData, SecretResponse, SecretWriteResponse};

use super::SuccessResponse;
use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::state::AppState;

/// Build the secrets router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/secrets", get(list_secrets).post(create_secret))
        .route(
            "/api/secrets/{*path}",
            get(read_secret).put(update_secret).delete(delete_secret),
        )
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSecretRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub data: Option<KvData>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSecretRequest {
    #[serde(default)]
    pub data: Option<KvData>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_secrets(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<KeyListResponse>, AppError> {
    let Query(query) = query?;
    let listing = state.client_for(&token).list_secrets(&query.path).await?;
    Ok(Json(listing))
}

async fn create_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    body: Result<Json<CreateSecretRequest>, JsonRejection>,
) -> Result<Json<SecretWriteResponse>, AppError> {
    let Json(body) = body?;

    let (Some(path), Some(data)) = (body.path.filter(|p| !p.is_empty()), body.data) else {
        return Err(AppError::BadRequest("Path and data are required".to_owned()));
    };

    let written = state.client_for(&token).put_secret(&path, &data).await?;
    Ok(Json(written))
}

async fn read_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(path): Path<String>,
) -> Result<Json<SecretResponse>, AppError> {
    let secret = state.client_for(&token).get_secret(&path).await?;
    Ok(Json(secret))
}

async fn update_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(path): Path<String>,
    body: Result<Json<UpdateSecretRequest>, JsonRejection>,
) -> Result<Json<SecretWriteResponse>, AppError> {
    let Json(body) = body?;
    let data = body
        .data
        .ok_or_else(|| AppError::BadRequest("Data is required".to_owned()))?;

    let written = state.client_for(&token).put_secret(&path, &data).await?;
    Ok(Json(written))
}

async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(path): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.client_for(&token).delete_secret(&path).await?;
    Ok(Json(SuccessResponse::OK))
}

//! Userpass account routes: `/api/users` and `/api/users/{username}`
//!
//! Passwords are write-only: they go upstream on create and update and are
//! never part of a read. An update may carry a new password, a new policy
//! list, both, or neither; each present field is a separate upstream write.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use baogate_upstream::{Ack, KeyListResponse, UserField, UserResponse, UserUpdate};

use super::SuccessResponse;
use crate::error::AppError;
use crate::middleware::CallerToken;
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/{username}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub policies: Option<Vec<String>>,
}

/// Outcome of an update: which fields were written, in order.
#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    pub success: bool,
    pub updated: Vec<UserField>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
) -> Result<Json<KeyListResponse>, AppError> {
    let users = state.client_for(&token).list_users().await?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(body) = body?;

    let (Some(username), Some(password)) = (
        body.username.filter(|u| !u.is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Username and password are required".to_owned(),
        ));
    };
    let policies = body.policies.unwrap_or_default();

    let ack = state
        .client_for(&token)
        .create_user(&username, &password, &policies)
        .await?;
    info!(user = %username, policies = ?policies, "user created");
    Ok(Json(ack))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.client_for(&token).get_user(&username).await?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(username): Path<String>,
    body: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<UpdateUserResponse>, AppError> {
    let Json(update) = body?;

    let report = state
        .client_for(&token)
        .update_user(&username, &update)
        .await?;
    info!(user = %username, updated = ?report.applied, "user updated");

    Ok(Json(UpdateUserResponse {
        success: true,
        updated: report.applied,
    }))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(token): Extension<CallerToken>,
    Path(username): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.client_for(&token).delete_user(&username).await?;
    info!(user = %username, "user deleted");
    Ok(Json(SuccessResponse::OK))
}

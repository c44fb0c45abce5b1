//! Login route: `POST /api/auth/login`
//!
//! Two methods share one response shape. `token` checks that a pasted token
//! reaches the upstream and echoes it back; `userpass` exchanges credentials
//! for a fresh token. Either way the console stores what comes back and
//! replays it on every later call.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Build the login router. Not wrapped by the token middleware.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/login", post(login))
}

// ── Request / Response types ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
}

/// A login request that passed structural validation.
enum Credentials {
    Token(String),
    Userpass { username: String, password: String },
}

impl TryFrom<LoginRequest> for Credentials {
    type Error = AppError;

    fn try_from(req: LoginRequest) -> Result<Self, Self::Error> {
        match req.method.as_deref() {
            Some("token") => non_empty(req.token)
                .map(Self::Token)
                .ok_or_else(|| AppError::BadRequest("Token is required".to_owned())),
            Some("userpass") => match (non_empty(req.username), non_empty(req.password)) {
                (Some(username), Some(password)) => Ok(Self::Userpass { username, password }),
                _ => Err(AppError::BadRequest(
                    "Username and password are required".to_owned(),
                )),
            },
            _ => Err(AppError::BadRequest("Invalid login method".to_owned())),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(body) = body?;

    let token = match Credentials::try_from(body)? {
        Credentials::Token(token) => {
            if !state.upstream.validate_token(&token).await {
                warn!("token login rejected");
                return Err(AppError::Unauthorized("Invalid token".to_owned()));
            }
            info!("token login accepted");
            token
        }
        Credentials::Userpass { username, password } => {
            let resp = state
                .upstream
                .login(&username, &password)
                .await
                .map_err(|e| {
                    warn!(user = %username, error = %e, "userpass login rejected");
                    AppError::Unauthorized(e.to_string())
                })?;
            info!(user = %username, "userpass login accepted");
            resp.auth.client_token
        }
    };

    Ok(Json(LoginResponse {
        success: true,
        token,
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

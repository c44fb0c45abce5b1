//! HTTP error types for the gateway.
//!
//! Every failure leaves the gateway as `{"error": message}` with one of three
//! statuses: 400 for a structurally incomplete request, 401 for a missing or
//! rejected token, 500 for anything the upstream refused. A partially applied
//! user update adds the `updated` and `failed` fields so the console can tell
//! which half landed.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use baogate_upstream::{UpstreamError, UserField, UserUpdateError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required field is missing or the body could not be decoded.
    #[error("{0}")]
    BadRequest(String),

    /// No token was presented, or login was refused.
    #[error("{0}")]
    Unauthorized(String),

    /// The upstream call failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// A user update stopped after applying some of its fields.
    #[error(transparent)]
    PartialUpdate(#[from] UserUpdateError),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<Vec<UserField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed: Option<UserField>,
}

impl ErrorBody {
    fn message(error: String) -> Self {
        Self {
            error,
            updated: None,
            failed: None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) | Self::PartialUpdate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) => ErrorBody::message(msg),
            Self::Upstream(err) => {
                tracing::error!(error = %err, upstream_status = ?err.status(), "upstream call failed");
                ErrorBody::message(err.to_string())
            }
            Self::PartialUpdate(err) => {
                tracing::error!(
                    error = %err.source,
                    applied = ?err.applied,
                    failed = %err.failed,
                    "user update failed"
                );
                ErrorBody {
                    error: err.source.to_string(),
                    updated: Some(err.applied),
                    failed: Some(err.failed),
                }
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

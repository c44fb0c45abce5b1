//! Token presence middleware.
//!
//! Reads the `x-openbao-token` header and hands it to downstream handlers as
//! a [`CallerToken`] extension. A missing or empty header is rejected with
//! 401 before any extractor or handler runs, so no upstream call is made.
//! The token itself is never inspected; the upstream decides whether it is
//! any good.

use std::fmt;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use baogate_core::GATEWAY_TOKEN_HEADER;

use crate::error::AppError;

/// The caller's upstream token, as received in the request header.
#[derive(Clone)]
pub struct CallerToken(String);

impl CallerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CallerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallerToken(..)")
    }
}

/// Reject requests that carry no token header.
///
/// # Errors
///
/// Returns [`AppError::Unauthorized`] if the header is missing, empty, or not
/// valid visible ASCII.
pub async fn require_token(mut req: Request, next: Next) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(GATEWAY_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let Some(token) = token else {
        debug!(path = %req.uri().path(), "request without gateway token");
        return Err(AppError::Unauthorized("Unauthorized".to_owned()));
    };

    req.extensions_mut().insert(CallerToken(token));
    Ok(next.run(req).await)
}

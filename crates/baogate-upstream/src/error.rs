//! Error types for the upstream client.

use crate::types::UserField;

/// Everything that can go wrong talking to the upstream server.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The upstream answered with a non-2xx status.
    ///
    /// `message` is the upstream's `errors[0]` when present, otherwise the
    /// canonical status text.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Human-readable message.
        message: String,
    },

    /// The request never produced a response.
    #[error("upstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx body did not match the expected envelope.
    #[error("malformed upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An HTTP method could not be constructed.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
}

impl UpstreamError {
    /// The upstream's HTTP status, for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the upstream rejected the credentials (401 or 403).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// A user update that stopped part-way.
///
/// The password and policy changes are separate upstream writes with no
/// rollback. `applied` lists what landed before `failed` was rejected.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct UserUpdateError {
    /// Fields already written upstream, in order.
    pub applied: Vec<UserField>,
    /// The field whose write failed.
    pub failed: UserField,
    /// The upstream failure.
    pub source: UpstreamError,
}

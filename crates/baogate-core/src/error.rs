//! Error types for `baogate-core`.

/// Errors from the session token carrier.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the durable token store failed.
    #[error("token store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A protected operation was attempted with no token in the session.
    #[error("not logged in")]
    NotAuthenticated,

    /// The in-memory store lock was poisoned by a panicking holder.
    #[error("token store lock poisoned")]
    Poisoned,
}

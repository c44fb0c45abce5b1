//! Client for the upstream OpenBao/Vault HTTP API.
//!
//! Two handles split the work:
//!
//! - [`Upstream`] is shared across requests. It owns the pooled HTTP client
//!   and the server address, and performs the calls that happen before a
//!   caller has a token (userpass login, token validation).
//! - [`OpenBaoClient`] is bound to exactly one caller token and issues every
//!   KV, user, and policy call with that token attached. Build one per inbound
//!   request with [`Upstream::bind`]; it holds no other state.
//!
//! Responses are decoded into the explicit envelopes in [`types`]. Any non-2xx
//! answer becomes [`UpstreamError::Api`] carrying the upstream's first error
//! string. Nothing is cached and nothing is retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use baogate_upstream::Upstream;
//!
//! # async fn example() -> Result<(), baogate_upstream::UpstreamError> {
//! let upstream = Upstream::from_addr("http://localhost:8200")?;
//! let login = upstream.login("alice", "pw").await?;
//! let client = upstream.bind(login.auth.client_token);
//! let listing = client.list_secrets("app").await?;
//! for key in listing.data.keys {
//!     println!("{key}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod types;

pub use client::{OpenBaoClient, Upstream};
pub use error::{UpstreamError, UserUpdateError};
pub use types::{
    Ack, AuthInfo, KeyList, KeyListResponse, KvData, LoginResponse, PolicyDocument,
    PolicyResponse, SecretMetadata, SecretResponse, SecretVersion, SecretWriteResponse, UserField,
    UserInfo, UserResponse, UserUpdate, UserUpdateReport,
};

/// Upstream address used when none is configured.
pub const DEFAULT_ADDR: &str = "http://localhost:8200";

/// Header the upstream reads the caller's token from.
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

const USER_AGENT: &str = concat!("baogate/", env!("CARGO_PKG_VERSION"));

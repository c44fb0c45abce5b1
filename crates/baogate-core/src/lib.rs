//! Core library for Baogate.
//!
//! Everything here is transport-free: the folder model layered over the
//! upstream's flat prefix listing, and the session object that carries a
//! caller's token between gateway calls. The HTTP client and the gateway
//! server build on these types.

pub mod error;
pub mod path;
pub mod session;

pub use error::SessionError;
pub use path::{Breadcrumb, ChildEntry, Location, PrefixLister};
pub use session::{FileTokenStore, MemoryTokenStore, Session, TokenStore};

/// Header the gateway reads the caller's token from.
pub const GATEWAY_TOKEN_HEADER: &str = "x-openbao-token";

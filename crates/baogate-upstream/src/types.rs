//! Wire types for the upstream API.
//!
//! One struct per response envelope. Fields the upstream sends but the
//! gateway never uses are ignored on decode; fields it may omit default.
//! Every envelope implements `Default` so a 204 or an empty body decodes to
//! an empty success value.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key/value payload of one secret version. Values are relayed as whatever
/// JSON the caller wrote: strings usually, but numbers and objects pass too.
pub type KvData = BTreeMap<String, Value>;

// ── Auth ─────────────────────────────────────────────────────────────

/// `POST /v1/auth/userpass/login/{username}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    pub auth: AuthInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthInfo {
    /// The issued session token.
    pub client_token: String,
    #[serde(default)]
    pub accessor: String,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub token_policies: Vec<String>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
}

// ── Listings ─────────────────────────────────────────────────────────

/// Any `LIST ...?list=true` response: KV prefixes, users, policies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyListResponse {
    pub data: KeyList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyList {
    /// Child names in upstream order. Names ending in `/` are sub-prefixes.
    #[serde(default)]
    pub keys: Vec<String>,
}

// ── KV v2 ────────────────────────────────────────────────────────────

/// `GET /v1/secret/data/{path}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretResponse {
    pub data: SecretVersion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretVersion {
    #[serde(default)]
    pub data: KvData,
    #[serde(default)]
    pub metadata: SecretMetadata,
}

/// Version metadata. Also the body of a KV write response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretMetadata {
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub custom_metadata: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub deletion_time: String,
    #[serde(default)]
    pub destroyed: bool,
    #[serde(default)]
    pub version: u64,
}

/// `POST /v1/secret/data/{path}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretWriteResponse {
    #[serde(default)]
    pub data: SecretMetadata,
}

// ── Userpass users ───────────────────────────────────────────────────

/// `GET /v1/auth/userpass/users/{username}`. The password is never returned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserResponse {
    pub data: UserInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub token_policies: Vec<String>,
}

/// A field of a user account that can be changed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserField {
    Password,
    Policies,
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => f.write_str("password"),
            Self::Policies => f.write_str("policies"),
        }
    }
}

/// Requested changes to a user. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub policies: Option<Vec<String>>,
}

impl UserUpdate {
    /// The password to write, if a non-empty one was given.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether applying this update would touch the upstream at all.
    pub fn is_noop(&self) -> bool {
        self.password().is_none() && self.policies.is_none()
    }
}

/// Fields written by a completed user update, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserUpdateReport {
    pub applied: Vec<UserField>,
}

// ── Policies ─────────────────────────────────────────────────────────

/// `GET /v1/sys/policy/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyResponse {
    pub data: PolicyDocument,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub name: String,
    /// Rule body, opaque to the gateway.
    #[serde(default)]
    pub rules: String,
}

/// Empty success (user writes, deletes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

// ── Request bodies and error envelope (crate-internal) ───────────────

#[derive(Serialize)]
pub(crate) struct PasswordBody<'a> {
    pub password: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SecretWriteBody<'a> {
    pub data: &'a KvData,
}

#[derive(Serialize)]
pub(crate) struct UserWriteBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policies: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<String>,
}

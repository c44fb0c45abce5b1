//! Upstream client implementation.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use baogate_core::PrefixLister;

use crate::error::{UpstreamError, UserUpdateError};
use crate::types::{
    Ack, ApiErrorBody, KeyListResponse, KvData, LoginResponse, PasswordBody, PolicyResponse,
    SecretResponse, SecretWriteBody, SecretWriteResponse, UserField, UserResponse, UserUpdate,
    UserUpdateReport, UserWriteBody,
};
use crate::{USER_AGENT, VAULT_TOKEN_HEADER};

/// Placeholder for calls that send no body.
const NO_BODY: Option<&()> = None;

/// Shared handle to one upstream server.
#[derive(Clone)]
pub struct Upstream {
    http: reqwest::Client,
    base_url: String,
}

impl Upstream {
    /// Wrap an existing HTTP client. A trailing `/` on `base_url` is dropped.
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Build a pooled HTTP client for `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Network`] if the TLS backend cannot initialize.
    pub fn from_addr(addr: &str) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(UpstreamError::Network)?;
        Ok(Self::new(http, addr))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A client that attaches `token` to every call.
    pub fn bind(&self, token: impl Into<String>) -> OpenBaoClient {
        OpenBaoClient {
            upstream: self.clone(),
            token: token.into(),
        }
    }

    /// Exchange userpass credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Api`] if the upstream rejects the credentials.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, UpstreamError> {
        let path = format!("/v1/auth/userpass/login/{}", urlencoding::encode(username));
        self.request(None, Method::POST, &path, Some(&PasswordBody { password }))
            .await
    }

    /// Check that `token` reaches the upstream.
    ///
    /// Calls the health endpoint with the token attached. A 2xx answer or 429
    /// (sealed or standby node) counts as valid; anything else, including a
    /// transport failure, does not. This is a presence check, not a
    /// capability check.
    pub async fn validate_token(&self, token: &str) -> bool {
        let url = format!("{}/v1/sys/health", self.base_url);
        match self
            .http
            .get(&url)
            .header(VAULT_TOKEN_HEADER, token)
            .send()
            .await
        {
            Ok(resp) => {
                let status = resp.status();
                debug!(status = status.as_u16(), "token validation response");
                status.is_success() || status == StatusCode::TOO_MANY_REQUESTS
            }
            Err(e) => {
                warn!(error = %e, "token validation request failed");
                false
            }
        }
    }

    async fn request<T, B>(
        &self,
        token: Option<&str>,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.request(method.clone(), &url);

        if let Some(token) = token {
            req = req.header(VAULT_TOKEN_HEADER, token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        debug!(method = %method, path = %path, status = status.as_u16(), "upstream call");

        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(T::default());
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl fmt::Debug for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstream")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Upstream client bound to a single caller token.
#[derive(Clone)]
pub struct OpenBaoClient {
    upstream: Upstream,
    token: String,
}

impl OpenBaoClient {
    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Default,
        B: Serialize + ?Sized,
    {
        self.upstream
            .request(Some(&self.token), method, path, body)
            .await
    }

    async fn list(&self, path: &str) -> Result<KeyListResponse, UpstreamError> {
        self.call(list_method()?, &format!("{path}?list=true"), NO_BODY)
            .await
    }

    // ── KV v2 ────────────────────────────────────────────────────────

    /// List the immediate children of a KV prefix. The empty prefix is root.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn list_secrets(&self, prefix: &str) -> Result<KeyListResponse, UpstreamError> {
        if prefix.is_empty() {
            self.list("/v1/secret/metadata").await
        } else {
            self.list(&format!("/v1/secret/metadata/{}", encode_path(prefix)))
                .await
        }
    }

    /// Read the current version of a leaf.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn get_secret(&self, path: &str) -> Result<SecretResponse, UpstreamError> {
        self.call(
            Method::GET,
            &format!("/v1/secret/data/{}", encode_path(path)),
            NO_BODY,
        )
        .await
    }

    /// Create or overwrite a leaf. Versioning is the upstream's concern.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn put_secret(
        &self,
        path: &str,
        data: &KvData,
    ) -> Result<SecretWriteResponse, UpstreamError> {
        self.call(
            Method::POST,
            &format!("/v1/secret/data/{}", encode_path(path)),
            Some(&SecretWriteBody { data }),
        )
        .await
    }

    /// Delete a leaf together with its version history.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn delete_secret(&self, path: &str) -> Result<Ack, UpstreamError> {
        self.call(
            Method::DELETE,
            &format!("/v1/secret/metadata/{}", encode_path(path)),
            NO_BODY,
        )
        .await
    }

    // ── Userpass users ───────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn list_users(&self) -> Result<KeyListResponse, UpstreamError> {
        self.list("/v1/auth/userpass/users").await
    }

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn get_user(&self, username: &str) -> Result<UserResponse, UpstreamError> {
        self.call(Method::GET, &user_path(username), NO_BODY).await
    }

    /// Create a user. Policies travel upstream as one comma-joined string.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        policies: &[String],
    ) -> Result<Ack, UpstreamError> {
        let body = UserWriteBody {
            password: Some(password),
            policies: Some(policies.join(",")),
        };
        self.call(Method::POST, &user_path(username), Some(&body))
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn set_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Ack, UpstreamError> {
        self.call(
            Method::POST,
            &format!("{}/password", user_path(username)),
            Some(&PasswordBody { password }),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn set_user_policies(
        &self,
        username: &str,
        policies: &[String],
    ) -> Result<Ack, UpstreamError> {
        let body = UserWriteBody {
            password: None,
            policies: Some(policies.join(",")),
        };
        self.call(Method::POST, &user_path(username), Some(&body))
            .await
    }

    /// Apply a password change and/or a policy change, in that order.
    ///
    /// Only the fields present in `update` are written, so an empty update
    /// makes no upstream call. The two writes are independent: if the policy
    /// write fails after the password write succeeded, the error reports the
    /// password as applied. Nothing is rolled back.
    ///
    /// # Errors
    ///
    /// Returns [`UserUpdateError`] naming the failed field and what was
    /// already applied.
    pub async fn update_user(
        &self,
        username: &str,
        update: &UserUpdate,
    ) -> Result<UserUpdateReport, UserUpdateError> {
        let mut applied = Vec::new();

        if let Some(password) = update.password() {
            if let Err(source) = self.set_user_password(username, password).await {
                return Err(UserUpdateError {
                    applied,
                    failed: UserField::Password,
                    source,
                });
            }
            applied.push(UserField::Password);
        }

        if let Some(policies) = &update.policies {
            if let Err(source) = self.set_user_policies(username, policies).await {
                if !applied.is_empty() {
                    warn!(user = %username, applied = ?applied, "user update partially applied");
                }
                return Err(UserUpdateError {
                    applied,
                    failed: UserField::Policies,
                    source,
                });
            }
            applied.push(UserField::Policies);
        }

        Ok(UserUpdateReport { applied })
    }

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn delete_user(&self, username: &str) -> Result<Ack, UpstreamError> {
        self.call(Method::DELETE, &user_path(username), NO_BODY)
            .await
    }

    // ── Policies ─────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn list_policies(&self) -> Result<KeyListResponse, UpstreamError> {
        self.list("/v1/sys/policy").await
    }

    /// # Errors
    ///
    /// Returns an error if the upstream call fails.
    pub async fn get_policy(&self, name: &str) -> Result<PolicyResponse, UpstreamError> {
        self.call(
            Method::GET,
            &format!("/v1/sys/policy/{}", urlencoding::encode(name)),
            NO_BODY,
        )
        .await
    }
}

impl fmt::Debug for OpenBaoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenBaoClient")
            .field("base_url", &self.upstream.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PrefixLister for OpenBaoClient {
    type Error = UpstreamError;

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, Self::Error> {
        Ok(self.list_secrets(prefix).await?.data.keys)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn list_method() -> Result<Method, UpstreamError> {
    Method::from_bytes(b"LIST").map_err(|e| UpstreamError::InvalidMethod(e.to_string()))
}

fn user_path(username: &str) -> String {
    format!("/v1/auth/userpass/users/{}", urlencoding::encode(username))
}

/// Percent-encode each segment of a slash-delimited path, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Pick the human-readable message for a failed call.
///
/// Prefers the upstream's `errors[0]`, then the canonical status text.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next())
        .filter(|m| !m.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

//! HTTP client for the Baogate gateway.
//!
//! Talks only to the gateway's `/api/*` surface, never to the upstream
//! directly. The session token is replayed in `x-openbao-token` on every
//! protected call. Transport failures and non-2xx answers both come back as a
//! single readable message: the gateway's `error` field when it sent one.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use baogate_core::{GATEWAY_TOKEN_HEADER, PrefixLister};
use baogate_upstream::{
    KeyListResponse, KvData, PolicyResponse, SecretResponse, SecretWriteResponse, UserField,
    UserResponse, UserUpdate,
};

// ── Wire shapes ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum LoginRequest<'a> {
    Token { token: &'a str },
    Userpass { username: &'a str, password: &'a str },
}

#[derive(Debug, Deserialize)]
pub struct LoginReply {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReply {
    #[serde(default)]
    pub updated: Vec<UserField>,
}

#[derive(Debug, Serialize)]
struct SecretBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    data: &'a KvData,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    username: &'a str,
    password: &'a str,
    policies: &'a [String],
}

#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    updated: Option<Vec<UserField>>,
    #[serde(default)]
    failed: Option<UserField>,
}

// ── Client ───────────────────────────────────────────────────────────

pub struct Gateway {
    http: reqwest::Client,
    addr: String,
    token: Option<String>,
}

impl Gateway {
    pub fn new(addr: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            addr: addr.trim_end_matches('/').to_owned(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("not logged in; run `baogate login` first"))?;
        Ok(self
            .http
            .request(method, self.url(path))
            .header(GATEWAY_TOKEN_HEADER, token))
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("could not reach the gateway at {}", self.addr))?;
        handle_response(resp).await
    }

    // ── Auth ─────────────────────────────────────────────────────────

    /// `POST /api/auth/login`. The only call made without a token.
    pub async fn login(&self, body: &LoginRequest<'_>) -> Result<LoginReply> {
        let req = self.http.post(self.url("/api/auth/login")).json(body);
        self.send(req).await
    }

    // ── Secrets ──────────────────────────────────────────────────────

    pub async fn list_secrets(&self, path: &str) -> Result<KeyListResponse> {
        let req = self
            .request(Method::GET, "/api/secrets")?
            .query(&[("path", path)]);
        self.send(req).await
    }

    pub async fn get_secret(&self, path: &str) -> Result<SecretResponse> {
        let req = self.request(Method::GET, &secret_route(path))?;
        self.send(req).await
    }

    pub async fn create_secret(&self, path: &str, data: &KvData) -> Result<SecretWriteResponse> {
        let body = SecretBody {
            path: Some(path),
            data,
        };
        let req = self.request(Method::POST, "/api/secrets")?.json(&body);
        self.send(req).await
    }

    pub async fn update_secret(&self, path: &str, data: &KvData) -> Result<SecretWriteResponse> {
        let body = SecretBody { path: None, data };
        let req = self.request(Method::PUT, &secret_route(path))?.json(&body);
        self.send(req).await
    }

    pub async fn delete_secret(&self, path: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &secret_route(path))?;
        self.send::<Value>(req).await.map(drop)
    }

    // ── Users ────────────────────────────────────────────────────────

    pub async fn list_users(&self) -> Result<KeyListResponse> {
        let req = self.request(Method::GET, "/api/users")?;
        self.send(req).await
    }

    pub async fn get_user(&self, username: &str) -> Result<UserResponse> {
        let req = self.request(Method::GET, &user_route(username))?;
        self.send(req).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        policies: &[String],
    ) -> Result<()> {
        let body = CreateUserBody {
            username,
            password,
            policies,
        };
        let req = self.request(Method::POST, "/api/users")?.json(&body);
        self.send::<Value>(req).await.map(drop)
    }

    pub async fn update_user(&self, username: &str, update: &UserUpdate) -> Result<UpdateReply> {
        let req = self.request(Method::PUT, &user_route(username))?.json(update);
        self.send(req).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &user_route(username))?;
        self.send::<Value>(req).await.map(drop)
    }

    // ── Policies ─────────────────────────────────────────────────────

    pub async fn list_policies(&self) -> Result<KeyListResponse> {
        let req = self.request(Method::GET, "/api/policies")?;
        self.send(req).await
    }

    pub async fn get_policy(&self, name: &str) -> Result<PolicyResponse> {
        let path = format!("/api/policies/{}", urlencoding::encode(name));
        let req = self.request(Method::GET, &path)?;
        self.send(req).await
    }
}

#[async_trait]
impl PrefixLister for Gateway {
    type Error = anyhow::Error;

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.list_secrets(prefix).await?.data.keys)
    }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await.context("failed to read response body")?;

    if !status.is_success() {
        bail!("{}", error_message(status, &body));
    }

    let body = if body.trim().is_empty() { "null" } else { &body };
    serde_json::from_str(body).context("failed to parse gateway response")
}

/// Reduce a failed gateway answer to one line.
fn error_message(status: StatusCode, body: &str) -> String {
    let reply: ErrorReply = serde_json::from_str(body).unwrap_or_default();
    let mut msg = reply
        .error
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| format!("gateway returned {status}"));

    if let Some(failed) = reply.failed {
        let applied = reply
            .updated
            .unwrap_or_default()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let applied = if applied.is_empty() {
            "nothing".to_owned()
        } else {
            applied.join(", ")
        };
        msg = format!("{msg} ({failed} not updated; applied: {applied})");
    }
    msg
}

fn secret_route(path: &str) -> String {
    let encoded = path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("/api/secrets/{encoded}")
}

fn user_route(username: &str) -> String {
    format!("/api/users/{}", urlencoding::encode(username))
}

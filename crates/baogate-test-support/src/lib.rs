//! Recording HTTP stub for integration tests.
//!
//! Binds an axum app on `127.0.0.1:0`, records every request it receives,
//! and answers with whatever the test's responder returns. The same stub
//! plays the upstream (token in `X-Vault-Token`) for the client and gateway
//! tests and the gateway (token in `x-openbao-token`) for the console tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Value of the stub's token header, if sent.
    pub token: Option<String>,
    pub body: Option<Value>,
}

type Responder = Arc<dyn Fn(&RecordedCall) -> (u16, Option<Value>) + Send + Sync>;

#[derive(Clone)]
struct StubState {
    token_header: &'static str,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responder: Responder,
}

pub struct StubServer {
    pub addr: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl StubServer {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Stand-in for the OpenBao server.
pub async fn spawn_upstream<F>(responder: F) -> StubServer
where
    F: Fn(&RecordedCall) -> (u16, Option<Value>) + Send + Sync + 'static,
{
    spawn("x-vault-token", responder).await
}

/// Stand-in for the Baogate gateway.
pub async fn spawn_gateway<F>(responder: F) -> StubServer
where
    F: Fn(&RecordedCall) -> (u16, Option<Value>) + Send + Sync + 'static,
{
    spawn("x-openbao-token", responder).await
}

/// Start a stub that answers every request with `responder(call)`, reading
/// the caller's token from `token_header`. A `None` body answers empty.
pub async fn spawn<F>(token_header: &'static str, responder: F) -> StubServer
where
    F: Fn(&RecordedCall) -> (u16, Option<Value>) + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        token_header,
        calls: Arc::clone(&calls),
        responder: Arc::new(responder),
    };

    let app = Router::new().fallback(record).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        addr: format!("http://{addr}"),
        calls,
    }
}

async fn record(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let call = RecordedCall {
        method: method.as_str().to_owned(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        token: headers
            .get(state.token_header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body: serde_json::from_slice(&body).ok(),
    };

    let (status, reply) = (state.responder)(&call);
    state.calls.lock().unwrap().push(call);

    let status = StatusCode::from_u16(status).unwrap();
    match reply {
        Some(json) => (status, axum::Json(json)).into_response(),
        None => status.into_response(),
    }
}

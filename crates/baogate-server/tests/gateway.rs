//! End-to-end tests for the gateway router against a recording stub upstream.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use baogate_server::build_router;
use baogate_server::state::AppState;
use baogate_test_support::spawn_upstream;
use baogate_upstream::Upstream;

const TOKEN: &str = "s.caller";

fn app(upstream_addr: &str) -> Router {
    let upstream = Upstream::from_addr(upstream_addr).unwrap();
    build_router(Arc::new(AppState::new(upstream)))
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-openbao-token", token);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

// ── Token precondition ───────────────────────────────────────────────

#[tokio::test]
async fn protected_routes_reject_missing_token_without_upstream_call() {
    let stub = spawn_upstream(|_| (200, Some(json!({"data": {"keys": []}})))).await;

    let cases = [
        ("GET", "/api/secrets?path=app", None),
        ("POST", "/api/secrets", Some(json!({"path": "x", "data": {"k": "v"}}))),
        ("GET", "/api/secrets/app/db", None),
        ("PUT", "/api/secrets/app/db", Some(json!({"data": {"k": "v"}}))),
        ("DELETE", "/api/secrets/app/db", None),
        ("GET", "/api/users", None),
        ("POST", "/api/users", Some(json!({"username": "a", "password": "b"}))),
        ("GET", "/api/users/alice", None),
        ("PUT", "/api/users/alice", Some(json!({"policies": ["a"]}))),
        ("DELETE", "/api/users/alice", None),
        ("GET", "/api/policies", None),
        ("GET", "/api/policies/default", None),
    ];

    for (method, uri, body) in cases {
        let (status, resp) = send(app(&stub.addr), request(method, uri, None, body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(resp, json!({"error": "Unauthorized"}), "{method} {uri}");
    }

    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn empty_token_header_is_unauthorized() {
    let stub = spawn_upstream(|_| (200, None)).await;

    let (status, _) = send(app(&stub.addr), request("GET", "/api/users", Some(""), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn caller_token_is_forwarded_upstream() {
    let stub = spawn_upstream(|_| (200, Some(json!({"data": {"keys": ["default"]}})))).await;

    let (status, _) = send(
        app(&stub.addr),
        request("GET", "/api/policies", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].token.as_deref(), Some(TOKEN));
}

// ── Secrets ──────────────────────────────────────────────────────────

#[tokio::test]
async fn list_secrets_passes_listing_through() {
    let listing = json!({"data": {"keys": ["db/", "api-key"]}});
    let reply = listing.clone();
    let stub = spawn_upstream(move |_| (200, Some(reply.clone()))).await;

    let (status, body) = send(
        app(&stub.addr),
        request("GET", "/api/secrets?path=app", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, listing);

    let calls = stub.calls();
    assert_eq!(calls[0].method, "LIST");
    assert_eq!(calls[0].path, "/v1/secret/metadata/app");
    assert_eq!(calls[0].query.as_deref(), Some("list=true"));
}

#[tokio::test]
async fn list_secrets_without_path_lists_root() {
    let stub = spawn_upstream(|_| (200, Some(json!({"data": {"keys": ["app/"]}})))).await;

    let (status, _) = send(
        app(&stub.addr),
        request("GET", "/api/secrets", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stub.calls()[0].path, "/v1/secret/metadata");
}

#[tokio::test]
async fn create_secret_requires_data() {
    let stub = spawn_upstream(|_| (200, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("POST", "/api/secrets", Some(TOKEN), Some(json!({"path": "x"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Path and data are required"}));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn create_secret_writes_data_envelope() {
    let stub = spawn_upstream(|_| (200, Some(json!({"data": {"version": 1}})))).await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "POST",
            "/api/secrets",
            Some(TOKEN),
            Some(json!({"path": "app/db", "data": {"user": "admin"}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], 1);

    let calls = stub.calls();
    assert_eq!(calls[0].method, "POST");
    assert_eq!(calls[0].path, "/v1/secret/data/app/db");
    assert_eq!(calls[0].body, Some(json!({"data": {"user": "admin"}})));
}

#[tokio::test]
async fn read_secret_accepts_nested_and_encoded_paths() {
    let stub = spawn_upstream(|_| {
        (
            200,
            Some(json!({"data": {"data": {"user": "admin"}, "metadata": {"version": 3}}})),
        )
    })
    .await;

    for uri in ["/api/secrets/app/db", "/api/secrets/app%2Fdb"] {
        let (status, body) = send(app(&stub.addr), request("GET", uri, Some(TOKEN), None)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["data"]["data"]["user"], "admin");
        assert_eq!(body["data"]["metadata"]["version"], 3);
    }

    let calls = stub.calls();
    assert!(calls.iter().all(|c| c.path == "/v1/secret/data/app/db"));
}

#[tokio::test]
async fn non_string_secret_values_pass_through_both_ways() {
    let stub = spawn_upstream(|call| match call.method.as_str() {
        "GET" => (
            200,
            Some(json!({
                "data": {"data": {"host": "db", "port": 5432}, "metadata": {"version": 2}}
            })),
        ),
        _ => (200, Some(json!({"data": {"version": 3}}))),
    })
    .await;

    let (status, body) = send(
        app(&stub.addr),
        request("GET", "/api/secrets/app/db", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["data"]["port"], 5432);

    let (status, _) = send(
        app(&stub.addr),
        request(
            "PUT",
            "/api/secrets/app/db",
            Some(TOKEN),
            Some(json!({"data": {"port": 6432, "tls": true}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stub.calls()[1].body,
        Some(json!({"data": {"port": 6432, "tls": true}}))
    );
}

#[tokio::test]
async fn update_secret_requires_data() {
    let stub = spawn_upstream(|_| (200, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("PUT", "/api/secrets/app/db", Some(TOKEN), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Data is required"}));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn delete_secret_returns_success() {
    let stub = spawn_upstream(|_| (204, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("DELETE", "/api/secrets/app/db", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let calls = stub.calls();
    assert_eq!(calls[0].method, "DELETE");
    assert_eq!(calls[0].path, "/v1/secret/metadata/app/db");
}

#[tokio::test]
async fn upstream_failure_surfaces_as_500_with_message() {
    let stub = spawn_upstream(|_| (403, Some(json!({"errors": ["permission denied"]})))).await;

    let (status, body) = send(
        app(&stub.addr),
        request("GET", "/api/secrets/app/db", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "permission denied"}));
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let stub = spawn_upstream(|_| (200, None)).await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/secrets")
        .header("x-openbao-token", TOKEN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(&stub.addr), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(stub.call_count(), 0);
}

// ── Login ────────────────────────────────────────────────────────────

#[tokio::test]
async fn userpass_login_returns_upstream_token() {
    let stub = spawn_upstream(|_| (200, Some(json!({"auth": {"client_token": "T"}})))).await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"method": "userpass", "username": "alice", "password": "pw"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "token": "T"}));

    let calls = stub.calls();
    assert_eq!(calls[0].path, "/v1/auth/userpass/login/alice");
    assert_eq!(calls[0].body, Some(json!({"password": "pw"})));
}

#[tokio::test]
async fn userpass_login_rejection_is_401() {
    let stub =
        spawn_upstream(|_| (400, Some(json!({"errors": ["invalid username or password"]})))).await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"method": "userpass", "username": "alice", "password": "no"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "invalid username or password"}));
}

#[tokio::test]
async fn token_login_echoes_reachable_token() {
    let stub = spawn_upstream(|_| (429, Some(json!({"standby": true})))).await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"method": "token", "token": "s.pasted"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "token": "s.pasted"}));
    assert_eq!(stub.calls()[0].token.as_deref(), Some("s.pasted"));
}

#[tokio::test]
async fn token_login_rejects_refused_token() {
    let stub = spawn_upstream(|_| (403, Some(json!({"errors": ["permission denied"]})))).await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"method": "token", "token": "s.bad"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid token"}));
}

#[tokio::test]
async fn login_with_unknown_method_is_bad_request() {
    let stub = spawn_upstream(|_| (200, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("POST", "/api/auth/login", None, Some(json!({"method": "ldap"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid login method"}));
    assert_eq!(stub.call_count(), 0);
}

// ── Users ────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_requires_username_and_password() {
    let stub = spawn_upstream(|_| (204, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("POST", "/api/users", Some(TOKEN), Some(json!({"username": "alice"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Username and password are required"}));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn create_user_joins_policies() {
    let stub = spawn_upstream(|_| (204, None)).await;

    let (status, _) = send(
        app(&stub.addr),
        request(
            "POST",
            "/api/users",
            Some(TOKEN),
            Some(json!({"username": "alice", "password": "pw", "policies": ["a", "b"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let calls = stub.calls();
    assert_eq!(calls[0].path, "/v1/auth/userpass/users/alice");
    assert_eq!(
        calls[0].body,
        Some(json!({"password": "pw", "policies": "a,b"}))
    );
}

#[tokio::test]
async fn policies_only_update_issues_one_call() {
    let stub = spawn_upstream(|_| (204, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "PUT",
            "/api/users/alice",
            Some(TOKEN),
            Some(json!({"policies": ["a", "b"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "updated": ["policies"]}));

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/v1/auth/userpass/users/alice");
    assert_eq!(calls[0].body, Some(json!({"policies": "a,b"})));
}

#[tokio::test]
async fn empty_update_makes_no_upstream_call() {
    let stub = spawn_upstream(|_| (204, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("PUT", "/api/users/alice", Some(TOKEN), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "updated": []}));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn partial_update_reports_what_landed() {
    let stub = spawn_upstream(|call| {
        if call.path.ends_with("/password") {
            (204, None)
        } else {
            (400, Some(json!({"errors": ["unknown policy"]})))
        }
    })
    .await;

    let (status, body) = send(
        app(&stub.addr),
        request(
            "PUT",
            "/api/users/alice",
            Some(TOKEN),
            Some(json!({"password": "new", "policies": ["nope"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"error": "unknown policy", "updated": ["password"], "failed": "policies"})
    );

    let calls = stub.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].path, "/v1/auth/userpass/users/alice/password");
    assert_eq!(calls[1].path, "/v1/auth/userpass/users/alice");
}

#[tokio::test]
async fn delete_user_returns_success() {
    let stub = spawn_upstream(|_| (204, None)).await;

    let (status, body) = send(
        app(&stub.addr),
        request("DELETE", "/api/users/alice", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(stub.calls()[0].method, "DELETE");
}

// ── Policies, health, headers ────────────────────────────────────────

#[tokio::test]
async fn get_policy_returns_rules() {
    let stub = spawn_upstream(|_| {
        (
            200,
            Some(json!({"data": {"name": "dev", "rules": "path \"secret/*\" {}"}})),
        )
    })
    .await;

    let (status, body) = send(
        app(&stub.addr),
        request("GET", "/api/policies/dev", Some(TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "dev");
    assert_eq!(body["data"]["rules"], "path \"secret/*\" {}");
    assert_eq!(stub.calls()[0].path, "/v1/sys/policy/dev");
}

#[tokio::test]
async fn health_needs_no_token_and_no_upstream() {
    let stub = spawn_upstream(|_| (500, None)).await;

    let (status, body) = send(app(&stub.addr), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
    assert_eq!(stub.call_count(), 0);
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let stub = spawn_upstream(|_| (200, None)).await;

    let resp = app(&stub.addr)
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    let headers = resp.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
}

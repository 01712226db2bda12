#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use keysvc_core::directory::{
    ServiceConfig, ServiceDirectory, ServiceEndpoint, ServiceName, StoreLocations,
};
use keysvc_core::freshness::{FRESHNESS_WINDOW_SECS, FixedClock};
use keysvc_core::generator::CredentialGenerator;
use keysvc_core::service::CredentialService;
use keysvc_server::routes;
use keysvc_server::state::AppState;
use keysvc_storage::{Collection, DocumentStore, MemoryBackend, StorageError};

const HOOKS_KEY: &str = "hooks-service-key";
const ORCH_KEY: &str = "orchestrator-key";
const BILLING_KEY: &str = "billing-service-key";

struct Harness {
    app: Router,
    backend: MemoryBackend,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let config = ServiceConfig {
        services: ServiceDirectory::new()
            .with(ServiceName::Hooks, ServiceEndpoint::new(HOOKS_KEY, "h"))
            .with(ServiceName::Orchestrator, ServiceEndpoint::new(ORCH_KEY, "o"))
            .with(ServiceName::Billing, ServiceEndpoint::new(BILLING_KEY, "b")),
        locations: StoreLocations::defaults().unwrap(),
    };
    let backend = MemoryBackend::new();
    let clock = Arc::new(FixedClock::new(1_700_000_000));
    let service = CredentialService::with_parts(
        config,
        Arc::new(backend.clone()),
        CredentialGenerator::default(),
        clock.clone(),
    );
    Harness {
        app: routes::router(Arc::new(AppState::with_service(service))),
        backend,
        clock,
    }
}

/// Fails every call.
struct BrokenStore;

#[async_trait::async_trait]
impl DocumentStore for BrokenStore {
    async fn upsert(
        &self,
        collection: &Collection,
        id: &str,
        _document: &[u8],
    ) -> Result<(), StorageError> {
        Err(StorageError::Write {
            collection: collection.to_string(),
            id: id.to_owned(),
            reason: "disk full".to_owned(),
        })
    }

    async fn find(
        &self,
        collection: &Collection,
        id: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Read {
            collection: collection.to_string(),
            id: id.to_owned(),
            reason: "connection refused".to_owned(),
        })
    }
}

fn broken_app() -> Router {
    let config = ServiceConfig {
        services: ServiceDirectory::new()
            .with(ServiceName::Hooks, ServiceEndpoint::new(HOOKS_KEY, "h")),
        locations: StoreLocations::defaults().unwrap(),
    };
    let service = CredentialService::with_parts(
        config,
        Arc::new(BrokenStore),
        CredentialGenerator::default(),
        Arc::new(FixedClock::new(1_700_000_000)),
    );
    routes::router(Arc::new(AppState::with_service(service)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn bundle_request(method: &str, user_id: Option<&str>, service_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/");
    if let Some(user_id) = user_id {
        builder = builder.header("X-User-ID", user_id);
    }
    if let Some(key) = service_key {
        builder = builder.header("X-Service-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

fn rpc(method: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/key.v1.KeyService/{method}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ── Liveness ─────────────────────────────────────────────────────────

#[tokio::test]
async fn liveness_endpoints() {
    let h = harness();

    let (status, body) = send(&h.app, Request::get("/ping").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String(".".to_owned()));

    for path in ["/health", "/probe"] {
        let (status, body) = send(&h.app, Request::get(path).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }
}

#[tokio::test]
async fn responses_carry_hardening_headers_and_request_id() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(headers["x-request-id"], "req-123");
}

// ── User bundles ─────────────────────────────────────────────────────

#[tokio::test]
async fn bundle_create_get_validate() {
    let h = harness();

    let (status, created) = send(&h.app, bundle_request("POST", Some("user-1"), Some(HOOKS_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "ok");
    for field in ["user_service", "hooks_service", "company_service", "billing_service", "permissions"] {
        let value = created[field].as_str().unwrap();
        assert_eq!(value.len(), 25, "{field}");
        assert!(value.bytes().all(|b| b.is_ascii_alphabetic()));
    }

    let (status, fetched) = send(&h.app, bundle_request("GET", Some("user1"), Some(ORCH_KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let key = created["company_service"].as_str().unwrap();
    let (status, body) = send(
        &h.app,
        Request::get(format!("/validate/{key}"))
            .header("x-user-id", "user1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, body) = send(
        &h.app,
        Request::get("/validate/notakey")
            .header("x-user-id", "user1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "not allowed");
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let h = harness();
    let (status, body) = send(&h.app, bundle_request("GET", Some("nobody"), Some(HOOKS_KEY))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not found");
}

#[tokio::test]
async fn stale_bundle_is_not_found() {
    let h = harness();
    let (status, _) = send(&h.app, bundle_request("POST", Some("u1"), Some(HOOKS_KEY))).await;
    assert_eq!(status, StatusCode::OK);

    h.clock.advance(FRESHNESS_WINDOW_SECS + 1);
    let (status, _) = send(&h.app, bundle_request("GET", Some("u1"), Some(HOOKS_KEY))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bundle_input_and_authorization_errors() {
    let h = harness();

    let (status, body) = send(&h.app, bundle_request("POST", Some("u1"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "missing service key");

    let (status, body) = send(&h.app, bundle_request("POST", Some("u1"), Some(BILLING_KEY))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "invalid service key");

    let (status, body) = send(&h.app, bundle_request("POST", None, Some(HOOKS_KEY))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "missing user id");

    let (status, _) = send(
        &h.app,
        Request::get("/validate/abc").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bundles = StoreLocations::defaults().unwrap().bundle;
    assert!(h.backend.find(&bundles, "u1").await.unwrap().is_none());
}

// ── RPC surface ──────────────────────────────────────────────────────

#[tokio::test]
async fn hook_keys_round_trip() {
    let h = harness();

    let (status, created) = send(
        &h.app,
        rpc("CreateHookKeys", &json!({ "service_key": HOOKS_KEY, "company_id": "c1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "ok");
    let key = created["key"].as_str().unwrap().to_owned();
    let secret = created["secret"].as_str().unwrap().to_owned();
    assert_eq!(key.len(), 32);
    assert_eq!(secret.len(), 32);

    let hooks = StoreLocations::defaults().unwrap().hooks;
    assert!(h.backend.find(&hooks, "c1").await.unwrap().is_some());

    let (_, fetched) = send(
        &h.app,
        rpc("GetHookKeys", &json!({ "service_key": ORCH_KEY, "company_id": "c1" })),
    )
    .await;
    assert_eq!(fetched["key"], key.as_str());
    assert!(fetched.get("secret").is_none());

    let (_, listed) = send(
        &h.app,
        rpc("GetHookKeysForCompany", &json!({ "service_key": HOOKS_KEY, "company_id": "c1" })),
    )
    .await;
    assert_eq!(listed["keys"].as_array().unwrap().len(), 1);
    assert_eq!(listed["keys"][0]["company_id"], "c1");

    let validate = |secret: &str| {
        rpc(
            "ValidateHookKey",
            &json!({ "service_key": HOOKS_KEY, "company_id": "c1", "key": key, "secret": secret }),
        )
    };
    let (_, body) = send(&h.app, validate(&secret)).await;
    assert_eq!(body, json!({ "status": "ok", "valid": true }));
    let (_, body) = send(&h.app, validate("wrong")).await;
    assert_eq!(body, json!({ "status": "ok", "valid": false }));
}

#[tokio::test]
async fn rpc_expected_outcomes_are_200_with_status() {
    let h = harness();

    let cases = [
        ("CreateAgentKeys", json!({ "company_id": "c1" }), "missing service key"),
        (
            "CreateAgentKeys",
            json!({ "service_key": BILLING_KEY, "company_id": "c1" }),
            "invalid service key",
        ),
        ("CreateAgentKeys", json!({ "service_key": HOOKS_KEY }), "missing company id"),
        ("CreateUserKeys", json!({ "service_key": ORCH_KEY }), "missing user id"),
        (
            "GetAgentKeys",
            json!({ "service_key": ORCH_KEY, "company_id": "nobody" }),
            "not found",
        ),
        (
            "ValidateUserKeys",
            json!({ "service_key": BILLING_KEY, "user_id": "u1", "key": "k", "secret": "s" }),
            "invalid service key",
        ),
    ];

    for (method, body, expected) in cases {
        let (status, reply) = send(&h.app, rpc(method, &body)).await;
        assert_eq!(status, StatusCode::OK, "{method}");
        assert_eq!(reply["status"], expected, "{method}");
    }

    let (_, listed) = send(
        &h.app,
        rpc("GetHookKeysForCompany", &json!({ "service_key": HOOKS_KEY, "company_id": "c2" })),
    )
    .await;
    assert_eq!(listed, json!({ "status": "ok", "keys": [] }));
}

#[tokio::test]
async fn user_and_agent_pairs_are_separate() {
    let h = harness();
    let (_, user) = send(
        &h.app,
        rpc("CreateUserKeys", &json!({ "service_key": HOOKS_KEY, "user_id": "u1" })),
    )
    .await;
    let (_, body) = send(
        &h.app,
        rpc(
            "ValidateUserKeys",
            &json!({ "service_key": HOOKS_KEY, "user_id": "u1", "key": user["key"], "secret": user["secret"] }),
        ),
    )
    .await;
    assert_eq!(body["valid"], true);

    let (_, body) = send(
        &h.app,
        rpc(
            "ValidateAgentKey",
            &json!({ "service_key": HOOKS_KEY, "company_id": "u1", "key": user["key"], "secret": user["secret"] }),
        ),
    )
    .await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn rpc_bodies_that_are_not_json_get_a_status_reply() {
    let h = harness();

    let malformed = Request::builder()
        .method("POST")
        .uri("/key.v1.KeyService/CreateHookKeys")
        .header("content-type", "application/json")
        .body(Body::from("{\"service_key\": "))
        .unwrap();
    let (status, body) = send(&h.app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "status": "invalid request body" }));

    let untyped = Request::builder()
        .method("POST")
        .uri("/key.v1.KeyService/ValidateHookKey")
        .body(Body::from(json!({ "service_key": HOOKS_KEY }).to_string()))
        .unwrap();
    let (status, body) = send(&h.app, untyped).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["status"], "invalid request body");

    let wrong_shape = rpc("GetAgentKeys", &json!({ "service_key": 7 }));
    let (status, body) = send(&h.app, wrong_shape).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], "invalid request body");

    let hooks = StoreLocations::defaults().unwrap().hooks;
    assert!(h.backend.find(&hooks, "c1").await.unwrap().is_none());
}

// ── Storage failures ─────────────────────────────────────────────────

#[tokio::test]
async fn storage_failures_are_system_errors_on_the_rpc_surface() {
    let app = broken_app();

    let (status, body) = send(
        &app,
        rpc("CreateHookKeys", &json!({ "service_key": HOOKS_KEY, "company_id": "c1" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "status": "system error" }));

    let (status, body) = send(
        &app,
        rpc(
            "ValidateHookKey",
            &json!({ "service_key": HOOKS_KEY, "company_id": "c1", "key": "k", "secret": "s" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "status": "system error", "valid": false }));

    let (status, body) = send(
        &app,
        rpc("GetHookKeysForCompany", &json!({ "service_key": HOOKS_KEY, "company_id": "c1" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "status": "system error", "keys": [] }));

    let (status, body) = send(&app, rpc("CreateUserKeys", &json!({ "user_id": "u1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "missing service key");
}

#[tokio::test]
async fn storage_failures_are_internal_errors_on_the_bundle_routes() {
    let app = broken_app();

    for method in ["POST", "GET"] {
        let (status, body) = send(&app, bundle_request(method, Some("u1"), Some(HOOKS_KEY))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method}");
        assert_eq!(body["status"], "internal error", "{method}");
    }

    let (status, _) = send(
        &app,
        Request::get("/validate/abc")
            .header("X-User-ID", "u1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

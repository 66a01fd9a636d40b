//! HTTP API integration tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; each
//! test gets its own database in a temporary directory.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use numtree_core::db::{DatabaseService, NodeStore, TursoStore};
use numtree_server::{create_router, AppState, JwtSecret};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const TEST_SECRET: &str = "api-test-secret-0123456789abcdef";

async fn create_test_app() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = DatabaseService::new(temp_dir.path().join("api.db"))
        .await
        .unwrap();
    let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(Arc::new(db)));

    let state = AppState::new(store, 2, &JwtSecret::new(TEST_SECRET));
    (create_router(state), temp_dir)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// A registered user's id and token
struct Session {
    id: String,
    token: String,
}

async fn register(app: &Router, username: &str) -> Session {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    Session {
        id: body["id"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

#[tokio::test]
async fn test_health() {
    let (app, _temp) = create_test_app().await;

    for uri in ["/", "/api/health"] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "connected");
    }
}

#[tokio::test]
async fn test_register_and_login() {
    let (app, _temp) = create_test_app().await;

    let alice = register(&app, "alice").await;
    assert_ne!(alice.token, alice.id);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["id"], alice.id.as_str());
    let login_token = body["token"].as_str().unwrap().to_string();

    // The login token is accepted for writes
    let (status, root) = send(
        &app,
        Method::POST,
        "/api/trees",
        Some(&login_token),
        Some(json!({ "value": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["authorId"], alice.id.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice", "password": "another-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "USERNAME_TAKEN");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "x", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_USERNAME");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "bob", "password": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "username": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (app, _temp) = create_test_app().await;
    register(&app, "alice").await;

    for credentials in [
        json!({ "username": "alice", "password": "wrong-horse" }),
        json!({ "username": "nobody", "password": "correct-horse" }),
    ] {
        let (status, body) = send(&app, Method::POST, "/api/auth/login", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");
        // Unknown names and wrong passwords are indistinguishable
        assert_eq!(body["message"], "Invalid username or password");
        assert!(body.get("token").is_none());
    }
}

#[tokio::test]
async fn test_public_author_id_is_not_a_credential() {
    let (app, _temp) = create_test_app().await;
    let alice = register(&app, "alice").await;

    let (_, root) = send(
        &app,
        Method::POST,
        "/api/trees",
        Some(&alice.token),
        Some(json!({ "value": 42 })),
    )
    .await;

    // Anyone can read the author id off the tree list
    let (_, trees) = send(&app, Method::GET, "/api/trees", None, None).await;
    let author_id = trees[0]["authorId"].as_str().unwrap().to_string();
    assert_eq!(author_id, alice.id);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(&author_id),
        Some(json!({ "parentId": root["id"], "op": "+", "right": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/trees",
        Some(&author_id),
        Some(json!({ "value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let (app, _temp) = create_test_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    // Alice's header and signature around Bob's claims
    let alice_parts: Vec<&str> = alice.token.split('.').collect();
    let bob_parts: Vec<&str> = bob.token.split('.').collect();
    let spliced = format!("{}.{}.{}", alice_parts[0], bob_parts[1], alice_parts[2]);

    for token in [spliced.as_str(), "not.a.jwt", "garbage"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/trees",
            Some(token),
            Some(json!({ "value": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_writes_require_a_known_user() {
    let (app, _temp) = create_test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/trees",
        None,
        Some(json!({ "value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/trees",
        Some("not-a-user"),
        Some(json!({ "value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tree_flow() {
    let (app, _temp) = create_test_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    let (status, root) = send(
        &app,
        Method::POST,
        "/api/trees",
        Some(&alice.token),
        Some(json!({ "value": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(root["kind"], "ROOT");
    assert_eq!(root["treeId"], root["id"]);
    assert_eq!(root["authorId"], alice.id.as_str());
    let root_id = root["id"].as_str().unwrap().to_string();

    let (status, reply) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(&bob.token),
        Some(json!({ "parentId": root_id, "op": "+", "right": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["value"], 52.0);
    assert_eq!(reply["parentId"], root_id.as_str());
    assert_eq!(reply["treeId"], root_id.as_str());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(&bob.token),
        Some(json!({ "parentId": root_id, "op": "/", "right": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_OPERATION");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(&bob.token),
        Some(json!({ "parentId": "missing", "op": "+", "right": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PARENT_NOT_FOUND");

    let (status, nodes) = send(&app, Method::GET, &format!("/api/trees/{}", root_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let nodes = nodes.as_array().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0]["id"], root_id.as_str());
    assert_eq!(nodes[0]["authorUsername"], "alice");
    assert_eq!(nodes[1]["id"], reply["id"]);
    assert_eq!(nodes[1]["authorId"], bob.id.as_str());
    assert_eq!(nodes[1]["authorUsername"], "bob");
    assert_eq!(nodes[1]["value"], 52.0);

    let (status, node) = send(
        &app,
        Method::GET,
        &format!("/api/nodes/{}", reply["id"].as_str().unwrap()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(node, reply);

    let (status, summaries) = send(&app, Method::GET, "/api/trees", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summaries[0]["id"], root_id.as_str());
    assert_eq!(summaries[0]["authorUsername"], "alice");
    assert_eq!(summaries[0]["replyCount"], 1);
    assert_eq!(summaries[0]["recentReplies"][0]["id"], reply["id"]);
}

#[tokio::test]
async fn test_tree_list_paging() {
    let (app, _temp) = create_test_app().await;
    let token = register(&app, "alice").await.token;

    let mut ids = Vec::new();
    for value in 0..3 {
        let (_, root) = send(
            &app,
            Method::POST,
            "/api/trees",
            Some(&token),
            Some(json!({ "value": value })),
        )
        .await;
        ids.push(root["id"].as_str().unwrap().to_string());
    }

    // Page size is capped at 2 for this app
    let (status, page) = send(&app, Method::GET, "/api/trees?limit=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["id"], ids[2].as_str());

    let (_, page) = send(&app, Method::GET, "/api/trees?offset=2&limit=2", None, None).await;
    assert_eq!(page.as_array().unwrap().len(), 1);
    assert_eq!(page[0]["id"], ids[0].as_str());

    let (_, all) = send(&app, Method::GET, "/api/trees", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_not_found_and_bad_bodies() {
    let (app, _temp) = create_test_app().await;
    let token = register(&app, "alice").await.token;

    let (status, body) = send(&app, Method::GET, "/api/trees/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TREE_NOT_FOUND");

    let (status, body) = send(&app, Method::GET, "/api/nodes/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NODE_NOT_FOUND");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/trees",
        Some(&token),
        Some(json!({ "value": "forty-two" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/nodes",
        Some(&token),
        Some(json!({ "parentId": "x", "op": "+" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

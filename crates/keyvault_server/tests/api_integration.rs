//! Integration tests for the KeyVault HTTP API.

mod support;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use support::{setup_test_server, START_MILLIS};

const UID: &str = "x-keyvault-uid";

fn paste_body(author_id: &str, is_private: bool) -> Value {
    json!({
        "title": "Deploy key",
        "content": "ABCD-EFGH-IJKL-MNOP",
        "author_id": author_id,
        "author_name": "Alice",
        "is_private": is_private,
        "type": "key",
        "duration_in_minutes": 60,
        "duration_label": "1 Hour",
        "created_at": "pending",
        "expires_at": START_MILLIS + 60 * 60_000,
        "views": 7
    })
}

async fn create(server: &TestServer, author_id: &str, is_private: bool) -> String {
    let response = server
        .post("/v1/pastes")
        .add_header(UID, author_id)
        .json(&paste_body(author_id, is_private))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();
    created["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn test_paste_lifecycle() {
    let (server, _temp, _clock) = setup_test_server();
    let id = create(&server, "alice", false).await;

    let get_response = server.get(&format!("/v1/pastes/{}", id)).await;
    assert_eq!(get_response.status_code(), StatusCode::OK);
    let paste: Value = get_response.json();
    assert_eq!(paste["id"], id.as_str());
    assert_eq!(paste["type"], "key");
    assert_eq!(paste["duration_in_minutes"], 60);
    assert_eq!(paste["created_at"], json!({ "at": START_MILLIS }));
    assert_eq!(paste["expires_at"], START_MILLIS + 60 * 60_000);
    assert_eq!(paste["views"], 0);

    let views_response = server.post(&format!("/v1/pastes/{}/views", id)).await;
    assert_eq!(views_response.status_code(), StatusCode::OK);
    let counted: Value = views_response.json();
    assert_eq!(counted["views"], 1);

    let again: Value = server.get(&format!("/v1/pastes/{}", id)).await.json();
    assert_eq!(again["views"], 1);
}

#[tokio::test]
async fn create_rejects_mismatched_caller() {
    let (server, _temp, _clock) = setup_test_server();

    let missing = server
        .post("/v1/pastes")
        .json(&paste_body("alice", false))
        .await;
    assert_eq!(missing.status_code(), StatusCode::FORBIDDEN);

    let spoofed = server
        .post("/v1/pastes")
        .add_header(UID, "mallory")
        .json(&paste_body("alice", false))
        .await;
    assert_eq!(spoofed.status_code(), StatusCode::FORBIDDEN);
    let body: Value = spoofed.json();
    assert_eq!(body["code"], "permission-denied");
}

#[tokio::test]
async fn create_enforces_size_and_shape() {
    let (server, _temp, _clock) = setup_test_server();

    let mut oversized = paste_body("alice", false);
    oversized["content"] = json!("x".repeat(2048));
    let too_large = server
        .post("/v1/pastes")
        .add_header(UID, "alice")
        .json(&oversized)
        .await;
    assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = too_large.json();
    assert_eq!(body["code"], "payload-too-large");

    let mut bad_duration = paste_body("alice", false);
    bad_duration["duration_in_minutes"] = json!(90);
    let invalid = server
        .post("/v1/pastes")
        .add_header(UID, "alice")
        .json(&bad_duration)
        .await;
    assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = invalid.json();
    assert_eq!(body["code"], "invalid-argument");
}

#[tokio::test]
async fn create_rejects_inconsistent_expiry() {
    let (server, _temp, _clock) = setup_test_server();

    let mut forever_with_expiry = paste_body("alice", false);
    forever_with_expiry["duration_in_minutes"] = json!(-1);
    forever_with_expiry["duration_label"] = json!("Forever");
    forever_with_expiry["expires_at"] = json!(5);

    let mut already_expired = paste_body("alice", false);
    already_expired["expires_at"] = json!(START_MILLIS);

    let mut missing_expiry = paste_body("alice", false);
    missing_expiry["expires_at"] = Value::Null;

    for body in [forever_with_expiry, already_expired, missing_expiry] {
        let response = server
            .post("/v1/pastes")
            .add_header(UID, "alice")
            .json(&body)
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["code"], "invalid-argument");
    }

    let listed: Vec<Value> = server
        .get("/v1/pastes")
        .add_query_param("author_id", "alice")
        .add_header(UID, "alice")
        .await
        .json();
    assert!(listed.is_empty());

    let mut forever = paste_body("alice", false);
    forever["duration_in_minutes"] = json!(-1);
    forever["expires_at"] = Value::Null;
    let accepted = server
        .post("/v1/pastes")
        .add_header(UID, "alice")
        .json(&forever)
        .await;
    assert_eq!(accepted.status_code(), StatusCode::CREATED);
}

#[tokio::test]
async fn missing_paste_is_not_found() {
    let (server, _temp, _clock) = setup_test_server();

    let response = server.get("/v1/pastes/does-not-exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "not-found");

    let views = server.post("/v1/pastes/does-not-exist/views").await;
    assert_eq!(views.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn private_paste_is_visible_to_its_author_only() {
    let (server, _temp, _clock) = setup_test_server();
    let id = create(&server, "alice", true).await;
    let path = format!("/v1/pastes/{}", id);

    let anonymous = server.get(&path).await;
    assert_eq!(anonymous.status_code(), StatusCode::FORBIDDEN);

    let stranger = server.get(&path).add_header(UID, "bob").await;
    assert_eq!(stranger.status_code(), StatusCode::FORBIDDEN);

    let views = server
        .post(&format!("{}/views", path))
        .add_header(UID, "bob")
        .await;
    assert_eq!(views.status_code(), StatusCode::FORBIDDEN);

    let owner = server.get(&path).add_header(UID, "alice").await;
    assert_eq!(owner.status_code(), StatusCode::OK);
    let paste: Value = owner.json();
    assert_eq!(paste["is_private"], true);
}

#[tokio::test]
async fn expired_paste_is_still_served() {
    let (server, _temp, clock) = setup_test_server();
    let id = create(&server, "alice", false).await;
    clock.advance(std::time::Duration::from_secs(2 * 60 * 60));

    let response = server.get(&format!("/v1/pastes/{}", id)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn list_returns_only_the_callers_pastes() {
    let (server, _temp, _clock) = setup_test_server();
    let first = create(&server, "alice", false).await;
    let second = create(&server, "alice", true).await;
    create(&server, "bob", false).await;

    let response = server
        .get("/v1/pastes")
        .add_query_param("author_id", "alice")
        .add_header(UID, "alice")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let pastes: Vec<Value> = response.json();
    let mut ids: Vec<&str> = pastes.iter().filter_map(|p| p["id"].as_str()).collect();
    ids.sort();
    let mut expected = vec![first.as_str(), second.as_str()];
    expected.sort();
    assert_eq!(ids, expected);

    let foreign = server
        .get("/v1/pastes")
        .add_query_param("author_id", "alice")
        .add_header(UID, "bob")
        .await;
    assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);

    let unfiltered = server.get("/v1/pastes").add_header(UID, "alice").await;
    assert_eq!(unfiltered.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sign_in_checks_origin_and_name() {
    let (server, _temp, _clock) = setup_test_server();

    let ok = server
        .post("/v1/auth/sign-in")
        .json(&json!({ "origin": "https://vault.example/", "display_name": " Alice " }))
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);
    let identity: Value = ok.json();
    assert_eq!(identity["display_name"], "Alice");
    assert_eq!(identity["photo_url"], Value::Null);
    assert_eq!(
        identity["id"].as_str(),
        Some(keyvault_core::derive_user_id("alice").as_str())
    );

    let foreign = server
        .post("/v1/auth/sign-in")
        .json(&json!({ "origin": "https://evil.example", "display_name": "Alice" }))
        .await;
    assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);
    let body: Value = foreign.json();
    assert_eq!(body["code"], "auth/unauthorized-domain");

    let blank = server
        .post("/v1/auth/sign-in")
        .json(&json!({ "origin": "https://vault.example", "display_name": "  " }))
        .await;
    assert_eq!(blank.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = blank.json();
    assert_eq!(body["code"], "auth/invalid-credential");
}

#[tokio::test]
async fn sign_out_and_health_respond() {
    let (server, _temp, _clock) = setup_test_server();

    let signed_out = server.post("/v1/auth/sign-out").await;
    assert_eq!(signed_out.status_code(), StatusCode::NO_CONTENT);

    let health = server.get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    let body: Value = health.json();
    assert_eq!(body["status"], "ok");
    health.assert_header("x-content-type-options", "nosniff");
}

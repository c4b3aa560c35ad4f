//! End-to-end tests for authentication endpoints
//!
//! Tests login, logout, session management, and permission checks.

mod common;

use common::{TestClient, TestServer, GABBAI_PASS, GABBAI_USER, VIEWER_USER};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn lesson_body() -> Value {
    json!({
        "title": "Daf Yomi",
        "time": "06:15",
        "rabbi": "Rav Katz",
        "date": "2030-01-01",
        "recurring": true
    })
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(GABBAI_USER, GABBAI_PASS).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("Session cookie not set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_login_with_invalid_password() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(GABBAI_USER, "wrong_password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_nonexistent_user() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login("nonexistent_user", "password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_reports_user_and_role() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = client.get_session().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_handle"], VIEWER_USER);
    assert_eq!(body["role"], "Viewer");
}

#[tokio::test]
async fn test_session_without_login_is_unauthorized() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_session().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;

    let response = client.create_lesson(lesson_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client.logout().await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.create_lesson(lesson_body()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logged_out_token_is_rejected_in_header() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.login(GABBAI_USER, GABBAI_PASS).await;
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    client.logout().await;

    let bare = reqwest::Client::new();
    let response = bare
        .get(format!("{}/v1/auth/session", server.base_url))
        .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_in_authorization_header_is_accepted() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let response = client.login(GABBAI_USER, GABBAI_PASS).await;
    let body: Value = response.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let bare = reqwest::Client::new();
    let response = bare
        .post(format!("{}/v1/lessons", server.base_url))
        .header(reqwest::header::AUTHORIZATION, token)
        .json(&lesson_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_mutations_require_a_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.create_lesson(lesson_body()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.delete("lessons", "1").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.get_all_announcements().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was written
    let lessons: Vec<Value> = client.get_lessons().await.json().await.unwrap();
    assert!(lessons.is_empty());
}

#[tokio::test]
async fn test_viewer_cannot_edit_board() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_viewer(server.base_url.clone()).await;

    let response = client.create_lesson(lesson_body()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.get_all_announcements().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client
        .upload("a.png", "image/png", common::png_bytes(64))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let mut limited = false;
    for _ in 0..30 {
        let response = client.login("nonexistent_user", "password").await;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert!(limited);
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/v1/auth/login", server.base_url))
        .json(&json!({ "user_handle": GABBAI_USER }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

//! End-to-end tests for image uploads

mod common;

use common::{png_bytes, TestClient, TestServer, TEST_MAX_UPLOAD_BYTES};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_upload_stores_and_serves_image() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;
    let image = png_bytes(512);

    let response = client.upload("Kiddush.PNG", "image/png", image.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    let filename = body["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".png"));
    assert_eq!(body["url"], format!("/uploads/{}", filename));
    assert!(server.uploads_dir.join(&filename).exists());

    let response = client.get_path(body["url"].as_str().unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().to_vec(), image);
}

#[tokio::test]
async fn test_repeated_uploads_get_distinct_names() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;

    let mut names = Vec::new();
    for _ in 0..3 {
        let response = client.upload("same.png", "image/png", png_bytes(64)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        names.push(body["filename"].as_str().unwrap().to_string());
    }
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);
}

#[tokio::test]
async fn test_upload_rejects_non_images() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;

    let response = client
        .upload("notes.txt", "text/plain", b"just some text".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid file type");

    // Declared as an image, but the bytes are not one
    let response = client
        .upload("fake.png", "image/png", b"definitely not a png".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;

    let response = client.upload_without_file().await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;

    let response = client
        .upload("huge.png", "image/png", png_bytes(TEST_MAX_UPLOAD_BYTES + 1))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let stored = std::fs::read_dir(&server.uploads_dir).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_upload_requires_session() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.upload("a.png", "image/png", png_bytes(64)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

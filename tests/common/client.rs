//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per board server endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    #[allow(dead_code)]
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// Creates a client logged in as the gabbai
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated_gabbai(base_url: String) -> Self {
        Self::authenticated_as(base_url, GABBAI_USER, GABBAI_PASS).await
    }

    /// Creates a client logged in as the read-only viewer
    pub async fn authenticated_viewer(base_url: String) -> Self {
        Self::authenticated_as(base_url, VIEWER_USER, VIEWER_PASS).await
    }

    async fn authenticated_as(base_url: String, handle: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(handle, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            handle,
            response.text().await
        );

        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    pub async fn login(&self, handle: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            json!({ "user_handle": handle, "password": password }),
        )
        .await
    }

    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    // ========================================================================
    // Board Endpoints
    // ========================================================================

    pub async fn get_home(&self) -> Response {
        self.get("/").await
    }

    pub async fn get_board(&self) -> Response {
        self.get("/v1/board").await
    }

    pub async fn get_lessons(&self) -> Response {
        self.get("/v1/lessons").await
    }

    pub async fn create_lesson(&self, body: serde_json::Value) -> Response {
        self.post_json("/v1/lessons", body).await
    }

    pub async fn get_memorials(&self) -> Response {
        self.get("/v1/memorials").await
    }

    pub async fn create_memorial(&self, body: serde_json::Value) -> Response {
        self.post_json("/v1/memorials", body).await
    }

    pub async fn get_torah_words(&self) -> Response {
        self.get("/v1/torah-words").await
    }

    pub async fn create_torah_word(&self, body: serde_json::Value) -> Response {
        self.post_json("/v1/torah-words", body).await
    }

    pub async fn get_announcements(&self) -> Response {
        self.get("/v1/announcements").await
    }

    pub async fn get_all_announcements(&self) -> Response {
        self.get("/v1/admin/announcements").await
    }

    pub async fn create_announcement(&self, body: serde_json::Value) -> Response {
        self.post_json("/v1/announcements", body).await
    }

    pub async fn get_shabbat_times(&self) -> Response {
        self.get("/v1/shabbat-times").await
    }

    pub async fn get_all_shabbat_times(&self) -> Response {
        self.get("/v1/shabbat-times/all").await
    }

    pub async fn create_shabbat_times(&self, body: serde_json::Value) -> Response {
        self.post_json("/v1/shabbat-times", body).await
    }

    pub async fn get_prayer_times(&self) -> Response {
        self.get("/v1/prayer-times").await
    }

    pub async fn create_prayer_times(&self, body: serde_json::Value) -> Response {
        self.post_json("/v1/prayer-times", body).await
    }

    /// Deletes a record, `collection` being the route segment (e.g. "lessons")
    pub async fn delete(&self, collection: &str, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/v1/{}/{}", collection, id)))
            .send()
            .await
            .expect("Request failed")
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    pub async fn upload(&self, file_name: &str, mime: &str, bytes: Vec<u8>) -> Response {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .expect("Invalid mime type");
        let form = Form::new().part(UPLOAD_FIELD, part);
        self.client
            .post(self.url("/v1/upload"))
            .multipart(form)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn upload_without_file(&self) -> Response {
        let form = Form::new().text("note", "no image here");
        self.client
            .post(self.url("/v1/upload"))
            .multipart(form)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_path(&self, path: &str) -> Response {
        self.get(path).await
    }
}

const UPLOAD_FIELD: &str = "file";

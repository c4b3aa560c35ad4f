use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::board_store::{Announcement, BoardStore, Lesson, Memorial, ShabbatTimes, TorahWord};

/// Where a display reads board content from.
#[async_trait]
pub trait BoardSource: Send + Sync {
    async fn fetch_lessons(&self) -> Result<Vec<Lesson>>;
    async fn fetch_memorials(&self) -> Result<Vec<Memorial>>;
    async fn fetch_torah_words(&self) -> Result<Vec<TorahWord>>;
    async fn fetch_announcements(&self) -> Result<Vec<Announcement>>;
    async fn fetch_shabbat_times(&self) -> Result<Vec<ShabbatTimes>>;
}

/// Reads the public routes of a running board server.
pub struct HttpBoardSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBoardSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch {}: status {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response of {}", url))
    }
}

#[async_trait]
impl BoardSource for HttpBoardSource {
    async fn fetch_lessons(&self) -> Result<Vec<Lesson>> {
        self.get_json("/v1/lessons").await
    }

    async fn fetch_memorials(&self) -> Result<Vec<Memorial>> {
        self.get_json("/v1/memorials").await
    }

    async fn fetch_torah_words(&self) -> Result<Vec<TorahWord>> {
        self.get_json("/v1/torah-words").await
    }

    async fn fetch_announcements(&self) -> Result<Vec<Announcement>> {
        self.get_json("/v1/announcements").await
    }

    async fn fetch_shabbat_times(&self) -> Result<Vec<ShabbatTimes>> {
        self.get_json("/v1/shabbat-times/all").await
    }
}

/// Reads a board store in the same process.
pub struct StoreBoardSource {
    store: Arc<dyn BoardStore>,
}

impl StoreBoardSource {
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BoardSource for StoreBoardSource {
    async fn fetch_lessons(&self) -> Result<Vec<Lesson>> {
        self.store.list_lessons()
    }

    async fn fetch_memorials(&self) -> Result<Vec<Memorial>> {
        self.store.list_memorials()
    }

    async fn fetch_torah_words(&self) -> Result<Vec<TorahWord>> {
        self.store.list_torah_words()
    }

    async fn fetch_announcements(&self) -> Result<Vec<Announcement>> {
        self.store.list_announcements()
    }

    async fn fetch_shabbat_times(&self) -> Result<Vec<ShabbatTimes>> {
        self.store.list_shabbat_times()
    }
}

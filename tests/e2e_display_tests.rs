//! End-to-end tests for the display poller reading a running server

mod common;

use common::{tomorrow_iso, TestClient, TestServer};
use serde_json::json;
use shul_board_server::display::{DisplayFeed, HttpBoardSource};
use shul_board_server::selection::ShabbatSource;
use shul_board_server::server::BoardSettings;
use std::time::Duration;

#[tokio::test]
async fn test_feed_follows_server_content() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;

    client
        .create_lesson(json!({
            "title": "Parsha shiur",
            "time": "21:00",
            "rabbi": "Rav Levi",
            "date": "2030-01-01",
        }))
        .await;
    client
        .create_shabbat_times(json!({
            "candle_lighting": "16:30",
            "shabbat_ends": "17:45",
            "parsha": "Vayera",
            "date": tomorrow_iso(),
        }))
        .await;

    let source = HttpBoardSource::new(&server.base_url, Duration::from_secs(5)).unwrap();
    let feed = DisplayFeed::new(BoardSettings::default());
    assert!(feed.refresh_content(&source).await);
    assert!(feed.refresh_shabbat_times(&source).await);

    let view = feed.view_now();
    assert_eq!(view.lessons.len(), 1);
    assert_eq!(view.lessons[0].title, "Parsha shiur");
    assert_eq!(view.shabbat_times.source, ShabbatSource::Store);
    assert_eq!(view.shabbat_times.parsha, "Vayera");
}

#[tokio::test]
async fn test_feed_keeps_last_good_data_when_server_goes_away() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_gabbai(server.base_url.clone()).await;
    client
        .create_memorial(json!({ "name": "Ploni ben Ploni", "years": 3, "date": "2030-01-01" }))
        .await;

    let source = HttpBoardSource::new(&server.base_url, Duration::from_secs(1)).unwrap();
    let feed = DisplayFeed::new(BoardSettings::default());
    assert!(feed.refresh_content(&source).await);

    drop(client);
    drop(server);
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!feed.refresh_content(&source).await);
    assert_eq!(feed.snapshot().memorials.len(), 1);
}

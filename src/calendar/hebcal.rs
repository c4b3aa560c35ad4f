use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Timelike};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use super::{CalendarShabbat, ShabbatCalendar};
use crate::board_store::TimeOfDay;

pub const DEFAULT_HEBCAL_BASE_URL: &str = "https://www.hebcal.com";

const PARSHA_PREFIX: &str = "פרשת ";

#[derive(Debug, Deserialize)]
struct HebcalResponse {
    #[serde(default)]
    items: Vec<HebcalItem>,
}

#[derive(Debug, Deserialize)]
struct HebcalItem {
    category: String,
    title: String,
    date: String,
    #[serde(default)]
    hebrew: Option<String>,
}

impl HebcalItem {
    fn time_and_date(&self) -> Result<(TimeOfDay, NaiveDate)> {
        let instant = DateTime::parse_from_rfc3339(&self.date)
            .with_context(|| format!("Invalid {} date: {}", self.category, self.date))?;
        let time = TimeOfDay::new(instant.hour() as u8, instant.minute() as u8)
            .ok_or_else(|| anyhow!("Invalid {} time: {}", self.category, self.date))?;
        Ok((time, instant.date_naive()))
    }

    fn display_name(&self) -> String {
        let name = self.hebrew.as_deref().unwrap_or(&self.title);
        name.strip_prefix(PARSHA_PREFIX).unwrap_or(name).to_string()
    }
}

fn parse_shabbat(response: HebcalResponse) -> Result<CalendarShabbat> {
    let find = |category: &str| response.items.iter().find(|i| i.category == category);

    let (candle_lighting, _) = find("candles")
        .ok_or_else(|| anyhow!("No candle lighting in Hebcal response"))?
        .time_and_date()?;
    let (shabbat_ends, date) = find("havdalah")
        .ok_or_else(|| anyhow!("No havdalah in Hebcal response"))?
        .time_and_date()?;
    let parsha = find("parashat")
        .or_else(|| find("holiday"))
        .map(HebcalItem::display_name)
        .unwrap_or_default();

    Ok(CalendarShabbat {
        candle_lighting,
        shabbat_ends,
        parsha,
        date,
    })
}

/// Shabbat times from the Hebcal API for one location.
///
/// The last answer is kept until its Shabbat is over.
pub struct HebcalClient {
    client: reqwest::Client,
    base_url: String,
    geonameid: String,
    cached: Mutex<Option<CalendarShabbat>>,
}

impl HebcalClient {
    pub fn new(base_url: &str, geonameid: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            geonameid: geonameid.to_string(),
            cached: Mutex::new(None),
        })
    }

    fn cached_for(&self, today: NaiveDate) -> Option<CalendarShabbat> {
        self.cached
            .lock()
            .unwrap()
            .as_ref()
            .filter(|cached| cached.date >= today)
            .cloned()
    }

    async fn fetch(&self, today: NaiveDate) -> Result<CalendarShabbat> {
        let url = format!("{}/shabbat", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("cfg", "json".to_string()),
                ("geonameid", self.geonameid.clone()),
                ("M", "on".to_string()),
                ("gy", today.year().to_string()),
                ("gm", today.month().to_string()),
                ("gd", today.day().to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch {}: status {}", url, response.status());
        }

        let body: HebcalResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response of {}", url))?;
        parse_shabbat(body)
    }
}

#[async_trait]
impl ShabbatCalendar for HebcalClient {
    async fn upcoming_shabbat(&self, today: NaiveDate) -> Result<CalendarShabbat> {
        if let Some(cached) = self.cached_for(today) {
            return Ok(cached);
        }
        let fetched = self.fetch(today).await?;
        info!(
            "Fetched Shabbat times for {} from Hebcal ({})",
            fetched.date, self.geonameid
        );
        *self.cached.lock().unwrap() = Some(fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const CHUKAT_RESPONSE: &str = r#"{
        "title": "Hebcal Kiryat Malakhi July 2025",
        "items": [
            {"title": "Candle lighting: 19:21", "date": "2025-07-04T19:21:00+03:00",
             "category": "candles", "hebrew": "הדלקת נרות"},
            {"title": "Parashat Chukat", "date": "2025-07-05",
             "category": "parashat", "hebrew": "פרשת חקת"},
            {"title": "Havdalah: 20:36", "date": "2025-07-05T20:36:00+03:00",
             "category": "havdalah", "hebrew": "הבדלה"}
        ]
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_weekly_response() {
        let response: HebcalResponse = serde_json::from_str(CHUKAT_RESPONSE).unwrap();
        let shabbat = parse_shabbat(response).unwrap();

        assert_eq!(shabbat.candle_lighting.to_string(), "19:21");
        assert_eq!(shabbat.shabbat_ends.to_string(), "20:36");
        assert_eq!(shabbat.parsha, "חקת");
        assert_eq!(shabbat.date, date(2025, 7, 5));
    }

    #[test]
    fn holiday_week_uses_holiday_name() {
        let response: HebcalResponse = serde_json::from_str(
            r#"{"items": [
                {"title": "Candle lighting: 18:10", "date": "2025-04-11T18:10:00+03:00", "category": "candles"},
                {"title": "Pesach I", "date": "2025-04-13", "category": "holiday"},
                {"title": "Havdalah: 19:22", "date": "2025-04-12T19:22:00+03:00", "category": "havdalah"}
            ]}"#,
        )
        .unwrap();
        let shabbat = parse_shabbat(response).unwrap();
        assert_eq!(shabbat.parsha, "Pesach I");
    }

    #[test]
    fn response_without_havdalah_is_an_error() {
        let response: HebcalResponse = serde_json::from_str(
            r#"{"items": [{"title": "Candle lighting: 19:21", "date": "2025-07-04T19:21:00+03:00", "category": "candles"}]}"#,
        )
        .unwrap();
        let err = parse_shabbat(response).unwrap_err();
        assert!(err.to_string().contains("havdalah"));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetches_once_and_caches_until_shabbat_ends() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_calls = calls.clone();
        let router = Router::new().route(
            "/shabbat",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let calls = seen_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(params.get("geonameid").map(String::as_str), Some("294117"));
                    assert_eq!(params.get("cfg").map(String::as_str), Some("json"));
                    Json(serde_json::from_str::<serde_json::Value>(CHUKAT_RESPONSE).unwrap())
                }
            }),
        );
        let base_url = serve(router).await;
        let client = HebcalClient::new(&base_url, "294117", Duration::from_secs(5)).unwrap();

        let first = client.upcoming_shabbat(date(2025, 7, 1)).await.unwrap();
        let second = client.upcoming_shabbat(date(2025, 7, 5)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        client.upcoming_shabbat(date(2025, 7, 6)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let router = Router::new().route(
            "/shabbat",
            get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base_url = serve(router).await;
        let client = HebcalClient::new(&base_url, "294117", Duration::from_secs(5)).unwrap();

        let err = client.upcoming_shabbat(date(2025, 7, 1)).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub uploads_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,

    pub session_ttl_hours: Option<u64>,
    pub max_upload_bytes: Option<usize>,

    pub board: Option<BoardConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BoardConfig {
    /// IANA zone name such as "Asia/Jerusalem".
    pub time_zone: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    /// Hebcal location; the lookup is off when unset.
    pub hebcal_geonameid: Option<String>,
    pub hebcal_timeout_secs: Option<u64>,
    pub hebcal_base_url: Option<String>,
    pub shabbat_poll_interval_secs: Option<u64>,
    pub content_poll_interval_secs: Option<u64>,
    pub display_limits: Option<DisplayLimitsConfig>,
    pub default_shabbat: Option<DefaultShabbatConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DisplayLimitsConfig {
    pub lessons: Option<usize>,
    pub memorials: Option<usize>,
    pub announcements: Option<usize>,
    pub torah_words: Option<usize>,
}

/// Shown when no upcoming Shabbat times are stored.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DefaultShabbatConfig {
    pub candle_lighting: Option<String>,
    pub shabbat_ends: Option<String>,
    pub parsha: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

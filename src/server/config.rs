use super::RequestsLoggingLevel;
use crate::selection::{BoardTimeZone, DefaultShabbatTimes, DisplayLimits, Moment};
use chrono::Utc;
use std::time::Duration;

/// Hebcal Shabbat lookup, used when no upcoming times are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HebcalSettings {
    pub geonameid: String,
    pub timeout: Duration,
    pub base_url: String,
}

/// How the board display is computed and refreshed.
#[derive(Clone, Debug)]
pub struct BoardSettings {
    /// Zone of the synagogue, used to decide "today".
    pub time_zone: BoardTimeZone,
    pub display_limits: DisplayLimits,
    pub default_shabbat: DefaultShabbatTimes,
    pub hebcal: Option<HebcalSettings>,
    pub shabbat_poll_interval: Duration,
    pub content_poll_interval: Duration,
}

impl BoardSettings {
    pub fn moment_now(&self) -> Moment {
        Moment::in_zone(Utc::now(), &self.time_zone)
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        BoardSettings {
            time_zone: BoardTimeZone::default(),
            display_limits: DisplayLimits::default(),
            default_shabbat: DefaultShabbatTimes::default(),
            hebcal: None,
            shabbat_poll_interval: Duration::from_secs(60),
            content_poll_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    pub frontend_dir_path: Option<String>,
    pub max_upload_bytes: usize,
    pub board: BoardSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            frontend_dir_path: None,
            max_upload_bytes: crate::uploads::DEFAULT_MAX_UPLOAD_BYTES,
            board: BoardSettings::default(),
        }
    }
}

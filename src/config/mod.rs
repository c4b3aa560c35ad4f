mod file_config;

pub use file_config::{BoardConfig, DefaultShabbatConfig, DisplayLimitsConfig, FileConfig};

use crate::board_store::TimeOfDay;
use crate::calendar::DEFAULT_HEBCAL_BASE_URL;
use crate::selection::{BoardTimeZone, DefaultShabbatTimes, DisplayLimits};
use crate::server::{BoardSettings, HebcalSettings, RequestsLoggingLevel, ServerConfig};
use crate::uploads::DEFAULT_MAX_UPLOAD_BYTES;
use crate::user::DEFAULT_SESSION_TTL;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub board: BoardSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let uploads_dir = file
            .uploads_dir
            .map(PathBuf::from)
            .or_else(|| cli.uploads_dir.clone())
            .unwrap_or_else(|| db_dir.join("uploads"));

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s)
                .ok_or_else(|| anyhow!("Invalid logging_level in config file: {}", s))?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let session_ttl = match file.session_ttl_hours {
            Some(hours) => hours
                .checked_mul(3600)
                .map(Duration::from_secs)
                .ok_or_else(|| anyhow!("session_ttl_hours too large: {}", hours))?,
            None => DEFAULT_SESSION_TTL,
        };
        if session_ttl.is_zero() {
            bail!("session_ttl_hours must be positive");
        }

        let max_upload_bytes = file.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            bail!("max_upload_bytes must be positive");
        }

        let board = resolve_board_settings(file.board.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            uploads_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            session_ttl,
            max_upload_bytes,
            board,
        })
    }

    pub fn board_db_path(&self) -> PathBuf {
        self.db_dir.join("board.db")
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            frontend_dir_path: self.frontend_dir_path.clone(),
            max_upload_bytes: self.max_upload_bytes,
            board: self.board.clone(),
        }
    }
}

/// Fills unset board settings with defaults and validates the rest.
pub fn resolve_board_settings(board: BoardConfig) -> Result<BoardSettings> {
    let defaults = BoardSettings::default();

    let time_zone = match (board.time_zone, board.utc_offset_minutes) {
        (Some(_), Some(_)) => bail!("Set either time_zone or utc_offset_minutes, not both"),
        (Some(name), None) => name
            .parse::<chrono_tz::Tz>()
            .map(BoardTimeZone::Named)
            .map_err(|_| anyhow!("Unknown time_zone: {}", name))?,
        (None, Some(minutes)) => BoardTimeZone::from_offset_minutes(minutes)
            .ok_or_else(|| anyhow!("utc_offset_minutes out of range: {}", minutes))?,
        (None, None) => defaults.time_zone,
    };

    let limits = board.display_limits.unwrap_or_default();
    let default_limits = DisplayLimits::default();
    let display_limits = DisplayLimits {
        lessons: limits.lessons.unwrap_or(default_limits.lessons),
        memorials: limits.memorials.unwrap_or(default_limits.memorials),
        announcements: limits.announcements.unwrap_or(default_limits.announcements),
        torah_words: limits.torah_words.unwrap_or(default_limits.torah_words),
    };

    let shabbat = board.default_shabbat.unwrap_or_default();
    let default_shabbat = DefaultShabbatTimes {
        candle_lighting: parse_time_setting(
            "candle_lighting",
            shabbat.candle_lighting,
            defaults.default_shabbat.candle_lighting,
        )?,
        shabbat_ends: parse_time_setting(
            "shabbat_ends",
            shabbat.shabbat_ends,
            defaults.default_shabbat.shabbat_ends,
        )?,
        parsha: shabbat
            .parsha
            .unwrap_or(defaults.default_shabbat.parsha),
    };

    let shabbat_poll_interval = poll_interval(
        "shabbat_poll_interval_secs",
        board.shabbat_poll_interval_secs,
        defaults.shabbat_poll_interval,
    )?;
    let content_poll_interval = poll_interval(
        "content_poll_interval_secs",
        board.content_poll_interval_secs,
        defaults.content_poll_interval,
    )?;

    let hebcal = match board.hebcal_geonameid {
        Some(geonameid) if geonameid.trim().is_empty() => bail!("hebcal_geonameid is empty"),
        Some(geonameid) => Some(HebcalSettings {
            geonameid: geonameid.trim().to_string(),
            timeout: poll_interval(
                "hebcal_timeout_secs",
                board.hebcal_timeout_secs,
                DEFAULT_HEBCAL_TIMEOUT,
            )?,
            base_url: board
                .hebcal_base_url
                .unwrap_or_else(|| DEFAULT_HEBCAL_BASE_URL.to_string()),
        }),
        None => None,
    };

    Ok(BoardSettings {
        time_zone,
        display_limits,
        default_shabbat,
        hebcal,
        shabbat_poll_interval,
        content_poll_interval,
    })
}

fn parse_time_setting(name: &str, raw: Option<String>, default: TimeOfDay) -> Result<TimeOfDay> {
    match raw {
        Some(s) => TimeOfDay::parse(&s).ok_or_else(|| anyhow!("Invalid {} time: {}", name, s)),
        None => Ok(default),
    }
}

const DEFAULT_HEBCAL_TIMEOUT: Duration = Duration::from_secs(5);

fn poll_interval(name: &str, secs: Option<u64>, default: Duration) -> Result<Duration> {
    match secs {
        Some(0) => bail!("{} must be positive", name),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(default),
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

//! Request payloads for board mutations and their validation into inserts.
//!
//! Payload fields are all optional at the serde level so that a missing field
//! is reported with its name instead of a generic deserialization error.

use super::models::{
    NewAnnouncement, NewLesson, NewMemorial, NewPrayerTimes, NewShabbatTimes, NewTorahWord,
    TimeOfDay,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

fn required_text(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_date(field: &'static str, value: Option<String>) -> Result<NaiveDate, ValidationError> {
    let raw = required_text(field, value)?;
    parse_date(&raw).ok_or_else(|| ValidationError::InvalidField {
        field,
        reason: format!("'{}' is not a YYYY-MM-DD date", raw),
    })
}

/// Accepts a plain `YYYY-MM-DD` date or an RFC 3339 instant, keeping its
/// calendar day.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

fn required_time(field: &'static str, value: Option<String>) -> Result<TimeOfDay, ValidationError> {
    let raw = required_text(field, value)?;
    TimeOfDay::parse(&raw).ok_or_else(|| ValidationError::InvalidField {
        field,
        reason: format!("'{}' is not a HH:MM time", raw),
    })
}

/// Accepts an RFC 3339 instant or a plain date, taken as midnight UTC.
fn parse_instant(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ValidationError::InvalidField {
            field,
            reason: format!("'{}' is not an RFC 3339 timestamp", raw),
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LessonPayload {
    pub title: Option<String>,
    pub time: Option<String>,
    pub rabbi: Option<String>,
    pub date: Option<String>,
    pub recurring: Option<bool>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl LessonPayload {
    pub fn validate(self) -> Result<NewLesson, ValidationError> {
        Ok(NewLesson {
            title: required_text("title", self.title)?,
            time: required_time("time", self.time)?,
            rabbi: required_text("rabbi", self.rabbi)?,
            date: required_date("date", self.date)?,
            recurring: self.recurring.unwrap_or(false),
            description: optional_text(self.description),
            image_url: optional_text(self.image_url),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MemorialPayload {
    pub name: Option<String>,
    pub years: Option<i64>,
    pub date: Option<String>,
    pub note: Option<String>,
    pub image_url: Option<String>,
}

impl MemorialPayload {
    pub fn validate(self) -> Result<NewMemorial, ValidationError> {
        let name = required_text("name", self.name)?;
        let years = self.years.ok_or(ValidationError::MissingField("years"))?;
        let years = u32::try_from(years).map_err(|_| ValidationError::InvalidField {
            field: "years",
            reason: format!("{} is not a non-negative number of years", years),
        })?;
        Ok(NewMemorial {
            name,
            years,
            date: required_date("date", self.date)?,
            note: optional_text(self.note),
            image_url: optional_text(self.image_url),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TorahWordPayload {
    pub content: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub image_url: Option<String>,
}

impl TorahWordPayload {
    pub fn validate(self) -> Result<NewTorahWord, ValidationError> {
        Ok(NewTorahWord {
            content: required_text("content", self.content)?,
            author: required_text("author", self.author)?,
            date: required_date("date", self.date)?,
            image_url: optional_text(self.image_url),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnnouncementPayload {
    pub title: Option<String>,
    pub content: Option<String>,
    pub priority: Option<i64>,
    pub image_url: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl AnnouncementPayload {
    /// `now` is used as the start of the visibility window when none is given.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewAnnouncement, ValidationError> {
        let title = required_text("title", self.title)?;
        let content = required_text("content", self.content)?;
        let start_date = match optional_text(self.start_date) {
            Some(raw) => parse_instant("start_date", &raw)?,
            None => now,
        };
        let end_date = optional_text(self.end_date)
            .map(|raw| parse_instant("end_date", &raw))
            .transpose()?;
        if let Some(end_date) = end_date {
            if end_date < start_date {
                return Err(ValidationError::InvalidField {
                    field: "end_date",
                    reason: "end_date precedes start_date".to_string(),
                });
            }
        }
        Ok(NewAnnouncement {
            title,
            content,
            priority: self.priority.unwrap_or(1),
            image_url: optional_text(self.image_url),
            start_date,
            end_date,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShabbatTimesPayload {
    pub candle_lighting: Option<String>,
    pub shabbat_ends: Option<String>,
    pub parsha: Option<String>,
    pub date: Option<String>,
}

impl ShabbatTimesPayload {
    pub fn validate(self) -> Result<NewShabbatTimes, ValidationError> {
        Ok(NewShabbatTimes {
            candle_lighting: required_time("candle_lighting", self.candle_lighting)?,
            shabbat_ends: required_time("shabbat_ends", self.shabbat_ends)?,
            parsha: required_text("parsha", self.parsha)?,
            date: required_date("date", self.date)?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PrayerTimesPayload {
    pub shacharit: Option<String>,
    pub mincha: Option<String>,
    pub maariv: Option<String>,
    pub date: Option<String>,
}

impl PrayerTimesPayload {
    pub fn validate(self) -> Result<NewPrayerTimes, ValidationError> {
        Ok(NewPrayerTimes {
            shacharit: required_time("shacharit", self.shacharit)?,
            mincha: required_time("mincha", self.mincha)?,
            maariv: required_time("maariv", self.maariv)?,
            date: required_date("date", self.date)?,
        })
    }
}

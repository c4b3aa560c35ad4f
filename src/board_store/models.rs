use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref TIME_OF_DAY_REGEX: Regex = Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap();
}

/// A wall-clock time in `HH:MM` (24h) format.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn parse(s: &str) -> Option<Self> {
        let captures = TIME_OF_DAY_REGEX.captures(s.trim())?;
        let hour = captures.get(1)?.as_str().parse().ok()?;
        let minute = captures.get(2)?.as_str().parse().ok()?;
        Self::new(hour, minute)
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TimeOfDay::parse(&value).ok_or_else(|| format!("Invalid time of day '{}'", value))
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// The kinds of content shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    Lesson,
    Memorial,
    TorahWord,
    Announcement,
    ShabbatTimes,
    PrayerTimes,
}

impl BoardKind {
    pub const ALL: [BoardKind; 6] = [
        BoardKind::Lesson,
        BoardKind::Memorial,
        BoardKind::TorahWord,
        BoardKind::Announcement,
        BoardKind::ShabbatTimes,
        BoardKind::PrayerTimes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BoardKind::Lesson => "lesson",
            BoardKind::Memorial => "memorial",
            BoardKind::TorahWord => "torah_word",
            BoardKind::Announcement => "announcement",
            BoardKind::ShabbatTimes => "shabbat_times",
            BoardKind::PrayerTimes => "prayer_times",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lesson" => Some(BoardKind::Lesson),
            "memorial" => Some(BoardKind::Memorial),
            "torah_word" => Some(BoardKind::TorahWord),
            "announcement" => Some(BoardKind::Announcement),
            "shabbat_times" => Some(BoardKind::ShabbatTimes),
            "prayer_times" => Some(BoardKind::PrayerTimes),
            _ => None,
        }
    }

    pub(super) fn table_name(&self) -> &'static str {
        match self {
            BoardKind::Lesson => "lessons",
            BoardKind::Memorial => "memorials",
            BoardKind::TorahWord => "torah_words",
            BoardKind::Announcement => "announcements",
            BoardKind::ShabbatTimes => "shabbat_times",
            BoardKind::PrayerTimes => "prayer_times",
        }
    }
}

// =============================================================================
// Stored records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub time: TimeOfDay,
    /// Name of the rabbi giving the lesson.
    pub rabbi: String,
    pub date: NaiveDate,
    pub recurring: bool,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memorial {
    pub id: i64,
    pub name: String,
    pub years: u32,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorahWord {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub date: NaiveDate,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Higher is more urgent.
    pub priority: i64,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShabbatTimes {
    pub id: i64,
    pub candle_lighting: TimeOfDay,
    pub shabbat_ends: TimeOfDay,
    pub parsha: String,
    /// The day from which this record applies.
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerTimes {
    pub id: i64,
    pub shacharit: TimeOfDay,
    pub mincha: TimeOfDay,
    pub maariv: TimeOfDay,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Validated inserts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLesson {
    pub title: String,
    pub time: TimeOfDay,
    pub rabbi: String,
    pub date: NaiveDate,
    pub recurring: bool,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMemorial {
    pub name: String,
    pub years: u32,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTorahWord {
    pub content: String,
    pub author: String,
    pub date: NaiveDate,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
    pub priority: i64,
    pub image_url: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShabbatTimes {
    pub candle_lighting: TimeOfDay,
    pub shabbat_ends: TimeOfDay,
    pub parsha: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrayerTimes {
    pub shacharit: TimeOfDay,
    pub mincha: TimeOfDay,
    pub maariv: TimeOfDay,
    pub date: NaiveDate,
}

//! Pure selection and ordering rules deciding what the board shows "now".
//!
//! Nothing here touches storage or the clock: the current instant is passed
//! in as a [`Moment`].

mod board;
#[cfg(test)]
mod properties;

pub use board::{compose_board, BoardSnapshot, BoardView, DisplayLimits};

use crate::board_store::{Announcement, Lesson, Memorial, ShabbatTimes, TimeOfDay, TorahWord};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Zone in which the board's calendar day turns over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardTimeZone {
    Fixed(FixedOffset),
    /// IANA zone, follows daylight saving changes.
    Named(Tz),
}

impl BoardTimeZone {
    pub fn from_offset_minutes(offset_minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(offset_minutes.checked_mul(60)?).map(BoardTimeZone::Fixed)
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            BoardTimeZone::Fixed(offset) => now.with_timezone(offset).date_naive(),
            BoardTimeZone::Named(tz) => now.with_timezone(tz).date_naive(),
        }
    }
}

impl Default for BoardTimeZone {
    fn default() -> Self {
        BoardTimeZone::Fixed(Utc.fix())
    }
}

/// The current instant together with the board's local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl Moment {
    pub fn at_offset_minutes(now: DateTime<Utc>, offset_minutes: i32) -> Self {
        let zone = BoardTimeZone::from_offset_minutes(offset_minutes).unwrap_or_default();
        Self::in_zone(now, &zone)
    }

    pub fn in_zone(now: DateTime<Utc>, zone: &BoardTimeZone) -> Self {
        Self {
            now,
            today: zone.local_date(now),
        }
    }
}

/// Shabbat times shown when no stored record applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultShabbatTimes {
    pub candle_lighting: TimeOfDay,
    pub shabbat_ends: TimeOfDay,
    pub parsha: String,
}

impl Default for DefaultShabbatTimes {
    fn default() -> Self {
        Self {
            candle_lighting: TimeOfDay::new(19, 12).unwrap_or_default(),
            shabbat_ends: TimeOfDay::new(20, 25).unwrap_or_default(),
            parsha: "קורח".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShabbatSource {
    Store,
    /// Looked up from the Hebcal calendar.
    Hebcal,
    Default,
}

/// The Shabbat times currently in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentShabbatTimes {
    pub source: ShabbatSource,
    /// Id of the stored record, absent for defaults.
    pub id: Option<i64>,
    pub candle_lighting: TimeOfDay,
    pub shabbat_ends: TimeOfDay,
    pub parsha: String,
    pub date: Option<NaiveDate>,
}

impl CurrentShabbatTimes {
    fn from_record(record: &ShabbatTimes) -> Self {
        Self {
            source: ShabbatSource::Store,
            id: Some(record.id),
            candle_lighting: record.candle_lighting,
            shabbat_ends: record.shabbat_ends,
            parsha: record.parsha.clone(),
            date: Some(record.date),
        }
    }

    fn from_default(default: &DefaultShabbatTimes) -> Self {
        Self {
            source: ShabbatSource::Default,
            id: None,
            candle_lighting: default.candle_lighting,
            shabbat_ends: default.shabbat_ends,
            parsha: default.parsha.clone(),
            date: None,
        }
    }
}

/// Picks the nearest upcoming Shabbat times record (today counts as upcoming).
/// Ties on the date go to the most recently created record.
pub fn select_current_shabbat(
    moment: &Moment,
    records: &[ShabbatTimes],
    default: &DefaultShabbatTimes,
) -> CurrentShabbatTimes {
    records
        .iter()
        .filter(|r| r.date >= moment.today)
        .min_by(|a, b| a.date.cmp(&b.date).then_with(|| b.id.cmp(&a.id)))
        .map(CurrentShabbatTimes::from_record)
        .unwrap_or_else(|| CurrentShabbatTimes::from_default(default))
}

/// Ascending by date then time of day. Recurring lessons are not expanded.
pub fn order_lessons(records: &[Lesson]) -> Vec<Lesson> {
    let mut lessons = records.to_vec();
    lessons.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.time.cmp(&b.time))
            .then_with(|| a.id.cmp(&b.id))
    });
    lessons
}

/// Most recent date first.
pub fn order_memorials(records: &[Memorial]) -> Vec<Memorial> {
    let mut memorials = records.to_vec();
    memorials.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    memorials
}

/// Most recent date first.
pub fn order_torah_words(records: &[TorahWord]) -> Vec<TorahWord> {
    let mut words = records.to_vec();
    words.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    words
}

pub fn is_announcement_active(moment: &Moment, announcement: &Announcement) -> bool {
    announcement.start_date <= moment.now
        && announcement
            .end_date
            .map(|end| end >= moment.now)
            .unwrap_or(true)
}

/// Announcements whose window contains `moment.now`, most urgent first.
pub fn select_active_announcements(moment: &Moment, records: &[Announcement]) -> Vec<Announcement> {
    let mut active: Vec<Announcement> = records
        .iter()
        .filter(|a| is_announcement_active(moment, a))
        .cloned()
        .collect();
    active.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.start_date.cmp(&b.start_date))
            .then_with(|| a.id.cmp(&b.id))
    });
    active
}

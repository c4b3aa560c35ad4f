mod demo;
mod models;
mod schema;
mod sqlite_board_store;
mod validation;

pub use demo::seed_demo_content;
pub use models::*;
pub use schema::BOARD_VERSIONED_SCHEMAS;
pub use sqlite_board_store::SqliteBoardStore;
pub use validation::{
    AnnouncementPayload, LessonPayload, MemorialPayload, PrayerTimesPayload, ShabbatTimesPayload,
    TorahWordPayload, ValidationError,
};

use anyhow::Result;

/// Persistence for board content.
///
/// Listing methods return records in insertion order; display ordering is
/// the caller's concern.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait BoardStore: Send + Sync {
    fn list_lessons(&self) -> Result<Vec<Lesson>>;
    fn insert_lesson(&self, lesson: &NewLesson) -> Result<Lesson>;

    fn list_memorials(&self) -> Result<Vec<Memorial>>;
    fn insert_memorial(&self, memorial: &NewMemorial) -> Result<Memorial>;

    fn list_torah_words(&self) -> Result<Vec<TorahWord>>;
    fn insert_torah_word(&self, torah_word: &NewTorahWord) -> Result<TorahWord>;

    fn list_announcements(&self) -> Result<Vec<Announcement>>;
    fn insert_announcement(&self, announcement: &NewAnnouncement) -> Result<Announcement>;

    fn list_shabbat_times(&self) -> Result<Vec<ShabbatTimes>>;
    fn insert_shabbat_times(&self, times: &NewShabbatTimes) -> Result<ShabbatTimes>;

    fn list_prayer_times(&self) -> Result<Vec<PrayerTimes>>;
    fn insert_prayer_times(&self, times: &NewPrayerTimes) -> Result<PrayerTimes>;

    /// Deletes the record of the given kind.
    /// Returns Ok(false) if no such record exists.
    fn delete(&self, kind: BoardKind, id: i64) -> Result<bool>;

    /// Total number of records across all kinds.
    fn count_records(&self) -> Result<usize>;
}

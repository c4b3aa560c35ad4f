use super::{
    order_lessons, order_memorials, order_torah_words, select_active_announcements,
    select_current_shabbat, CurrentShabbatTimes, DefaultShabbatTimes, Moment,
};
use crate::board_store::{Announcement, Lesson, Memorial, ShabbatTimes, TorahWord};
use serde::{Deserialize, Serialize};

/// How many items of each kind fit on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayLimits {
    pub lessons: usize,
    pub memorials: usize,
    pub announcements: usize,
    pub torah_words: usize,
}

impl Default for DisplayLimits {
    fn default() -> Self {
        Self {
            lessons: 4,
            memorials: 3,
            announcements: 2,
            torah_words: 1,
        }
    }
}

/// Unordered board content as read from a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub lessons: Vec<Lesson>,
    pub memorials: Vec<Memorial>,
    pub torah_words: Vec<TorahWord>,
    pub announcements: Vec<Announcement>,
    pub shabbat_times: Vec<ShabbatTimes>,
}

/// What the display shows at a given moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub shabbat_times: CurrentShabbatTimes,
    pub lessons: Vec<Lesson>,
    pub memorials: Vec<Memorial>,
    pub torah_words: Vec<TorahWord>,
    pub announcements: Vec<Announcement>,
}

fn truncated<T>(mut items: Vec<T>, limit: usize) -> Vec<T> {
    items.truncate(limit);
    items
}

pub fn compose_board(
    moment: &Moment,
    snapshot: &BoardSnapshot,
    limits: &DisplayLimits,
    default_shabbat: &DefaultShabbatTimes,
) -> BoardView {
    BoardView {
        shabbat_times: select_current_shabbat(moment, &snapshot.shabbat_times, default_shabbat),
        lessons: truncated(order_lessons(&snapshot.lessons), limits.lessons),
        memorials: truncated(order_memorials(&snapshot.memorials), limits.memorials),
        torah_words: truncated(order_torah_words(&snapshot.torah_words), limits.torah_words),
        announcements: truncated(
            select_active_announcements(moment, &snapshot.announcements),
            limits.announcements,
        ),
    }
}

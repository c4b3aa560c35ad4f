//! Keeps a display's copy of the board fresh by polling a source.
//!
//! Shabbat times and the rest of the content are polled on separate
//! intervals. A failed poll leaves the previous data in place.

mod feed;
mod source;

pub use feed::{spawn_pollers, DisplayFeed, PollerHandles};
pub use source::{BoardSource, HttpBoardSource, StoreBoardSource};

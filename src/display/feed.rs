use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::BoardSource;
use crate::selection::{compose_board, BoardSnapshot, BoardView, Moment};
use crate::server::BoardSettings;

/// The display's local copy of the board.
pub struct DisplayFeed {
    snapshot: RwLock<BoardSnapshot>,
    settings: BoardSettings,
}

fn replace_part<T>(kind: &str, slot: &mut Vec<T>, fetched: Result<Vec<T>>) -> bool {
    match fetched {
        Ok(items) => {
            debug!("Refreshed {} ({} items)", kind, items.len());
            *slot = items;
            true
        }
        Err(err) => {
            warn!("Failed to refresh {}, keeping previous data: {:#}", kind, err);
            false
        }
    }
}

impl DisplayFeed {
    pub fn new(settings: BoardSettings) -> Self {
        Self {
            snapshot: RwLock::new(BoardSnapshot::default()),
            settings,
        }
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    /// Polls Shabbat times. Returns whether the poll succeeded.
    pub async fn refresh_shabbat_times(&self, source: &dyn BoardSource) -> bool {
        let fetched = source.fetch_shabbat_times().await;
        let mut snapshot = self.snapshot.write().unwrap();
        replace_part("shabbat times", &mut snapshot.shabbat_times, fetched)
    }

    /// Polls lessons, memorials, Torah words and announcements. Each part is
    /// replaced independently. Returns whether every part succeeded.
    pub async fn refresh_content(&self, source: &dyn BoardSource) -> bool {
        let lessons = source.fetch_lessons().await;
        let memorials = source.fetch_memorials().await;
        let torah_words = source.fetch_torah_words().await;
        let announcements = source.fetch_announcements().await;

        let mut snapshot = self.snapshot.write().unwrap();
        let results = [
            replace_part("lessons", &mut snapshot.lessons, lessons),
            replace_part("memorials", &mut snapshot.memorials, memorials),
            replace_part("torah words", &mut snapshot.torah_words, torah_words),
            replace_part("announcements", &mut snapshot.announcements, announcements),
        ];
        results.iter().all(|ok| *ok)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshot.read().unwrap().clone()
    }

    pub fn view_at(&self, moment: &Moment) -> BoardView {
        let snapshot = self.snapshot.read().unwrap();
        compose_board(
            moment,
            &snapshot,
            &self.settings.display_limits,
            &self.settings.default_shabbat,
        )
    }

    pub fn view_now(&self) -> BoardView {
        self.view_at(&self.settings.moment_now())
    }
}

pub struct PollerHandles {
    pub shabbat_times: JoinHandle<()>,
    pub content: JoinHandle<()>,
}

async fn poll_loop<F, Fut>(name: &'static str, period: Duration, shutdown: CancellationToken, mut poll: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Polling {} every {}s", name, period.as_secs());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                poll().await;
            }
            _ = shutdown.cancelled() => {
                info!("{} poller shutting down", name);
                break;
            }
        }
    }
}

/// Starts the two polling loops. Both poll immediately, then on their
/// configured intervals, until `shutdown` is cancelled.
pub fn spawn_pollers(
    feed: Arc<DisplayFeed>,
    source: Arc<dyn BoardSource>,
    shutdown: CancellationToken,
) -> PollerHandles {
    let shabbat_times = {
        let feed = feed.clone();
        let source = source.clone();
        let period = feed.settings.shabbat_poll_interval;
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            poll_loop("shabbat times", period, shutdown, || {
                let feed = feed.clone();
                let source = source.clone();
                async move { feed.refresh_shabbat_times(source.as_ref()).await }
            })
            .await
        })
    };

    let content = {
        let period = feed.settings.content_poll_interval;
        tokio::spawn(async move {
            poll_loop("board content", period, shutdown, || {
                let feed = feed.clone();
                let source = source.clone();
                async move { feed.refresh_content(source.as_ref()).await }
            })
            .await
        })
    };

    PollerHandles {
        shabbat_times,
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_store::{
        Announcement, BoardStore, Lesson, Memorial, NewLesson, NewShabbatTimes, ShabbatTimes,
        SqliteBoardStore, TimeOfDay, TorahWord,
    };
    use crate::display::StoreBoardSource;
    use crate::selection::{test_records, ShabbatSource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Serves fixed data until switched off, then fails every call.
    struct SwitchableSource {
        online: AtomicBool,
        lessons: Vec<Lesson>,
        shabbat_times: Vec<ShabbatTimes>,
    }

    impl SwitchableSource {
        fn check(&self) -> Result<()> {
            if self.online.load(Ordering::SeqCst) {
                Ok(())
            } else {
                anyhow::bail!("network down")
            }
        }
    }

    #[async_trait]
    impl BoardSource for SwitchableSource {
        async fn fetch_lessons(&self) -> Result<Vec<Lesson>> {
            self.check()?;
            Ok(self.lessons.clone())
        }

        async fn fetch_memorials(&self) -> Result<Vec<Memorial>> {
            self.check()?;
            Ok(vec![])
        }

        async fn fetch_torah_words(&self) -> Result<Vec<TorahWord>> {
            self.check()?;
            Ok(vec![])
        }

        async fn fetch_announcements(&self) -> Result<Vec<Announcement>> {
            self.check()?;
            Ok(vec![])
        }

        async fn fetch_shabbat_times(&self) -> Result<Vec<ShabbatTimes>> {
            self.check()?;
            Ok(self.shabbat_times.clone())
        }
    }

    fn switchable_source() -> SwitchableSource {
        let d = test_records::date(2025, 6, 20);
        SwitchableSource {
            online: AtomicBool::new(true),
            lessons: vec![test_records::lesson(1, d, "20:00")],
            shabbat_times: vec![test_records::shabbat(1, d, "Korach")],
        }
    }

    #[tokio::test]
    async fn never_loaded_feed_shows_defaults() {
        let feed = DisplayFeed::new(BoardSettings::default());
        let view = feed.view_at(&Moment::at_offset_minutes(chrono::Utc::now(), 0));
        assert_eq!(view.shabbat_times.source, ShabbatSource::Default);
        assert!(view.lessons.is_empty());
        assert!(view.announcements.is_empty());
    }

    #[tokio::test]
    async fn failed_poll_keeps_last_good_data() {
        let source = switchable_source();
        let feed = DisplayFeed::new(BoardSettings::default());

        assert!(feed.refresh_content(&source).await);
        assert!(feed.refresh_shabbat_times(&source).await);
        assert_eq!(feed.snapshot().lessons.len(), 1);

        source.online.store(false, Ordering::SeqCst);
        assert!(!feed.refresh_content(&source).await);
        assert!(!feed.refresh_shabbat_times(&source).await);

        let snapshot = feed.snapshot();
        assert_eq!(snapshot.lessons.len(), 1);
        assert_eq!(snapshot.shabbat_times.len(), 1);

        let moment = Moment::at_offset_minutes(
            test_records::date(2025, 6, 18)
                .and_hms_opt(10, 0, 0)
                .unwrap()
                .and_utc(),
            0,
        );
        let view = feed.view_at(&moment);
        assert_eq!(view.shabbat_times.source, ShabbatSource::Store);
        assert_eq!(view.shabbat_times.parsha, "Korach");
    }

    #[tokio::test]
    async fn successful_poll_replaces_wholesale() {
        let mut source = switchable_source();
        let feed = DisplayFeed::new(BoardSettings::default());
        feed.refresh_content(&source).await;

        source.lessons = vec![];
        feed.refresh_content(&source).await;
        assert!(feed.snapshot().lessons.is_empty());
    }

    #[tokio::test]
    async fn store_source_reads_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteBoardStore::new(dir.path().join("board.db")).unwrap());
        let d = test_records::date(2030, 1, 4);
        store
            .insert_lesson(&NewLesson {
                title: "Gemara".to_string(),
                time: TimeOfDay::new(20, 0).unwrap(),
                rabbi: "Rav Levi".to_string(),
                date: d,
                recurring: true,
                description: None,
                image_url: None,
            })
            .unwrap();
        store
            .insert_shabbat_times(&NewShabbatTimes {
                candle_lighting: TimeOfDay::new(16, 30).unwrap(),
                shabbat_ends: TimeOfDay::new(17, 45).unwrap(),
                parsha: "Vaera".to_string(),
                date: d,
            })
            .unwrap();

        let source = StoreBoardSource::new(store);
        let feed = DisplayFeed::new(BoardSettings::default());
        assert!(feed.refresh_content(&source).await);
        assert!(feed.refresh_shabbat_times(&source).await);
        assert_eq!(feed.snapshot().lessons[0].title, "Gemara");
        assert_eq!(feed.snapshot().shabbat_times[0].parsha, "Vaera");
    }

    #[tokio::test]
    async fn pollers_load_immediately_and_stop_on_shutdown() {
        let source: Arc<dyn BoardSource> = Arc::new(switchable_source());
        let feed = Arc::new(DisplayFeed::new(BoardSettings::default()));
        let shutdown = CancellationToken::new();

        let handles = spawn_pollers(feed.clone(), source, shutdown.clone());

        let mut loaded = false;
        for _ in 0..50 {
            let snapshot = feed.snapshot();
            if !snapshot.lessons.is_empty() && !snapshot.shabbat_times.is_empty() {
                loaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(loaded);

        shutdown.cancel();
        handles.shabbat_times.await.unwrap();
        handles.content.await.unwrap();
    }
}

use super::test_records::{announcement, date, lesson, memorial, shabbat, torah_word};
use super::*;
use chrono::{Duration, TimeZone};
use proptest::prelude::*;
use std::cmp::Reverse;

fn day(offset: i64) -> NaiveDate {
    date(2025, 1, 1) + Duration::days(offset)
}

// Narrow ranges so that equal dates and times show up often.
fn arb_day() -> impl Strategy<Value = i64> {
    0i64..40
}

fn arb_time() -> impl Strategy<Value = String> {
    (6u8..23, prop_oneof![Just(0u8), Just(30u8)]).prop_map(|(h, m)| format!("{:02}:{:02}", h, m))
}

fn arb_lessons() -> impl Strategy<Value = Vec<Lesson>> {
    prop::collection::vec((arb_day(), arb_time()), 0..24)
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (d, time))| lesson(i as i64 + 1, day(d), &time))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn arb_memorials() -> impl Strategy<Value = Vec<Memorial>> {
    prop::collection::vec(arb_day(), 0..24)
        .prop_map(|days| {
            days.into_iter()
                .enumerate()
                .map(|(i, d)| memorial(i as i64 + 1, day(d)))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn arb_torah_words() -> impl Strategy<Value = Vec<TorahWord>> {
    prop::collection::vec(arb_day(), 0..12)
        .prop_map(|days| {
            days.into_iter()
                .enumerate()
                .map(|(i, d)| torah_word(i as i64 + 1, day(d)))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn arb_shabbat_times() -> impl Strategy<Value = Vec<ShabbatTimes>> {
    prop::collection::vec(arb_day(), 0..12)
        .prop_map(|days| {
            days.into_iter()
                .enumerate()
                .map(|(i, d)| shabbat(i as i64 + 1, day(d), "parsha"))
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

fn base_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap()
}

/// Windows start within a day either side of the base instant.
fn arb_announcements() -> impl Strategy<Value = Vec<Announcement>> {
    let window = (
        0i64..4,
        -1440i64..1440,
        prop::option::of(0i64..2880),
    );
    prop::collection::vec(window, 0..16).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (priority, start, length))| {
                let start = base_instant() + Duration::minutes(start);
                let end = length.map(|l| start + Duration::minutes(l));
                announcement(i as i64 + 1, priority, start, end)
            })
            .collect::<Vec<_>>()
    })
}

fn arb_moment() -> impl Strategy<Value = Moment> {
    (-1440i64..1440).prop_map(|minutes| {
        let now = base_instant() + Duration::minutes(minutes);
        Moment {
            now,
            today: now.date_naive(),
        }
    })
}

fn sorted_ids(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.collect();
    ids.sort_unstable();
    ids
}

proptest! {
    #[test]
    fn lessons_are_a_sorted_permutation(records in arb_lessons()) {
        let ordered = order_lessons(&records);

        prop_assert_eq!(
            sorted_ids(ordered.iter().map(|l| l.id)),
            sorted_ids(records.iter().map(|l| l.id))
        );
        for pair in ordered.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!((a.date, a.time, a.id) < (b.date, b.time, b.id));
        }
    }

    #[test]
    fn memorials_never_increase_in_date(records in arb_memorials()) {
        let ordered = order_memorials(&records);

        prop_assert_eq!(ordered.len(), records.len());
        for pair in ordered.windows(2) {
            prop_assert!(pair[0].date >= pair[1].date);
            if pair[0].date == pair[1].date {
                prop_assert!(pair[0].id > pair[1].id);
            }
        }
    }

    #[test]
    fn torah_words_never_increase_in_date(records in arb_torah_words()) {
        let ordered = order_torah_words(&records);

        prop_assert_eq!(ordered.len(), records.len());
        for pair in ordered.windows(2) {
            prop_assert!((pair[0].date, pair[0].id) > (pair[1].date, pair[1].id));
        }
    }

    #[test]
    fn only_active_announcements_are_selected(
        moment in arb_moment(),
        records in arb_announcements(),
    ) {
        let active = select_active_announcements(&moment, &records);
        let active_ids: Vec<i64> = active.iter().map(|a| a.id).collect();

        for record in &records {
            let window_contains_now = record.start_date <= moment.now
                && record.end_date.map_or(true, |end| moment.now <= end);
            prop_assert_eq!(active_ids.contains(&record.id), window_contains_now);
        }
        for pair in active.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                (Reverse(a.priority), a.start_date, a.id) < (Reverse(b.priority), b.start_date, b.id)
            );
        }
    }

    #[test]
    fn shabbat_is_the_nearest_upcoming_newest_record(
        today in arb_day(),
        records in arb_shabbat_times(),
    ) {
        let moment = Moment {
            now: day(today).and_hms_opt(12, 0, 0).unwrap().and_utc(),
            today: day(today),
        };
        let default = DefaultShabbatTimes::default();
        let current = select_current_shabbat(&moment, &records, &default);

        let upcoming: Vec<&ShabbatTimes> =
            records.iter().filter(|r| r.date >= moment.today).collect();
        match upcoming.iter().map(|r| r.date).min() {
            None => {
                prop_assert_eq!(current.source, ShabbatSource::Default);
                prop_assert_eq!(current.id, None);
            }
            Some(nearest) => {
                let newest = upcoming
                    .iter()
                    .filter(|r| r.date == nearest)
                    .map(|r| r.id)
                    .max();
                prop_assert_eq!(current.source, ShabbatSource::Store);
                prop_assert_eq!(current.date, Some(nearest));
                prop_assert_eq!(current.id, newest);
            }
        }
    }

    #[test]
    fn board_truncation_keeps_order(
        lessons in arb_lessons(),
        memorials in arb_memorials(),
        torah_words in arb_torah_words(),
        announcements in arb_announcements(),
        moment in arb_moment(),
        limits in (0usize..6, 0usize..6, 0usize..6, 0usize..6),
    ) {
        let limits = DisplayLimits {
            lessons: limits.0,
            memorials: limits.1,
            announcements: limits.2,
            torah_words: limits.3,
        };
        let snapshot = BoardSnapshot {
            lessons,
            memorials,
            torah_words,
            announcements,
            shabbat_times: Vec::new(),
        };
        let view = compose_board(&moment, &snapshot, &limits, &DefaultShabbatTimes::default());

        let prefix = |limit: usize, len: usize| limit.min(len);

        let lessons = order_lessons(&snapshot.lessons);
        prop_assert_eq!(&view.lessons[..], &lessons[..prefix(limits.lessons, lessons.len())]);

        let memorials = order_memorials(&snapshot.memorials);
        prop_assert_eq!(
            &view.memorials[..],
            &memorials[..prefix(limits.memorials, memorials.len())]
        );

        let words = order_torah_words(&snapshot.torah_words);
        prop_assert_eq!(&view.torah_words[..], &words[..prefix(limits.torah_words, words.len())]);

        let active = select_active_announcements(&moment, &snapshot.announcements);
        prop_assert_eq!(
            &view.announcements[..],
            &active[..prefix(limits.announcements, active.len())]
        );
    }
}

use super::models::{NewLesson, NewMemorial, NewPrayerTimes, NewTorahWord, TimeOfDay};
use super::BoardStore;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

fn time(raw: &str) -> Result<TimeOfDay> {
    TimeOfDay::parse(raw).with_context(|| format!("Invalid demo time {}", raw))
}

/// Inserts a small set of sample content when the store is empty.
/// Returns whether anything was inserted.
pub fn seed_demo_content(store: &dyn BoardStore, today: NaiveDate) -> Result<bool> {
    if store.count_records()? > 0 {
        info!("Board database already has content, skipping demo seed");
        return Ok(false);
    }

    store.insert_lesson(&NewLesson {
        title: "שיעור בגמרא".to_string(),
        time: time("08:00")?,
        rabbi: "הרב כהן".to_string(),
        date: today,
        recurring: true,
        description: None,
        image_url: None,
    })?;
    store.insert_memorial(&NewMemorial {
        name: "יוסף בן שרה".to_string(),
        years: 25,
        date: today,
        note: Some("זכרונו לברכה".to_string()),
        image_url: None,
    })?;
    store.insert_torah_word(&NewTorahWord {
        content: "זכור את יום השבת לקדשו - השבת היא מקור הברכה".to_string(),
        author: "הרב דוד".to_string(),
        date: today,
        image_url: None,
    })?;
    store.insert_prayer_times(&NewPrayerTimes {
        shacharit: time("08:00")?,
        mincha: time("19:00")?,
        maariv: time("20:30")?,
        date: today,
    })?;

    info!("Seeded board database with demo content");
    Ok(true)
}

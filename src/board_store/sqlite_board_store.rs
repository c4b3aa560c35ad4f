use super::models::*;
use super::schema::BOARD_VERSIONED_SCHEMAS;
use super::BoardStore;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct SqliteBoardStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBoardStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned_db(db_path, BOARD_VERSIONED_SCHEMAS)
            .context("Failed to open board database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn now() -> DateTime<Utc> {
        // Truncated to whole seconds so that returned records match what is read back.
        let secs = Utc::now().timestamp();
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }

    fn list<T, F>(&self, sql: &str, map_row: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn get_date(row: &Row, column: &str) -> rusqlite::Result<NaiveDate> {
    let idx = row.as_ref().column_index(column)?;
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|err| conversion_error(idx, err))
}

fn get_time(row: &Row, column: &str) -> rusqlite::Result<TimeOfDay> {
    let idx = row.as_ref().column_index(column)?;
    let raw: String = row.get(idx)?;
    TimeOfDay::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("Invalid time of day '{}'", raw).into(),
        )
    })
}

fn get_instant(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let idx = row.as_ref().column_index(column)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| conversion_error(idx, err))
    })
    .transpose()
}

fn get_created_at(row: &Row) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get("created_at")?;
    Ok(DateTime::from_timestamp(secs, 0).unwrap_or_default())
}

fn row_to_lesson(row: &Row) -> rusqlite::Result<Lesson> {
    Ok(Lesson {
        id: row.get("id")?,
        title: row.get("title")?,
        time: get_time(row, "time")?,
        rabbi: row.get("rabbi")?,
        date: get_date(row, "date")?,
        recurring: row.get("recurring")?,
        description: row.get("description")?,
        image_url: row.get("image_url")?,
        created_at: get_created_at(row)?,
    })
}

fn row_to_memorial(row: &Row) -> rusqlite::Result<Memorial> {
    Ok(Memorial {
        id: row.get("id")?,
        name: row.get("name")?,
        years: row.get("years")?,
        date: get_date(row, "date")?,
        note: row.get("note")?,
        image_url: row.get("image_url")?,
        created_at: get_created_at(row)?,
    })
}

fn row_to_torah_word(row: &Row) -> rusqlite::Result<TorahWord> {
    Ok(TorahWord {
        id: row.get("id")?,
        content: row.get("content")?,
        author: row.get("author")?,
        date: get_date(row, "date")?,
        image_url: row.get("image_url")?,
        created_at: get_created_at(row)?,
    })
}

fn row_to_announcement(row: &Row) -> rusqlite::Result<Announcement> {
    let start_date = get_instant(row, "start_date")?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "start_date".to_string(), rusqlite::types::Type::Null)
    })?;
    Ok(Announcement {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        priority: row.get("priority")?,
        image_url: row.get("image_url")?,
        start_date,
        end_date: get_instant(row, "end_date")?,
        created_at: get_created_at(row)?,
    })
}

fn row_to_shabbat_times(row: &Row) -> rusqlite::Result<ShabbatTimes> {
    Ok(ShabbatTimes {
        id: row.get("id")?,
        candle_lighting: get_time(row, "candle_lighting")?,
        shabbat_ends: get_time(row, "shabbat_ends")?,
        parsha: row.get("parsha")?,
        date: get_date(row, "date")?,
        created_at: get_created_at(row)?,
    })
}

fn row_to_prayer_times(row: &Row) -> rusqlite::Result<PrayerTimes> {
    Ok(PrayerTimes {
        id: row.get("id")?,
        shacharit: get_time(row, "shacharit")?,
        mincha: get_time(row, "mincha")?,
        maariv: get_time(row, "maariv")?,
        date: get_date(row, "date")?,
        created_at: get_created_at(row)?,
    })
}

impl BoardStore for SqliteBoardStore {
    fn list_lessons(&self) -> Result<Vec<Lesson>> {
        self.list("SELECT * FROM lessons ORDER BY id", row_to_lesson)
    }

    fn insert_lesson(&self, lesson: &NewLesson) -> Result<Lesson> {
        let created_at = Self::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO lessons (title, time, rabbi, date, recurring, description, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                lesson.title,
                lesson.time.to_string(),
                lesson.rabbi,
                format_date(&lesson.date),
                lesson.recurring,
                lesson.description,
                lesson.image_url,
                created_at.timestamp(),
            ],
        )
        .context("Failed to insert lesson")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted lesson {}", id);
        Ok(Lesson {
            id,
            title: lesson.title.clone(),
            time: lesson.time,
            rabbi: lesson.rabbi.clone(),
            date: lesson.date,
            recurring: lesson.recurring,
            description: lesson.description.clone(),
            image_url: lesson.image_url.clone(),
            created_at,
        })
    }

    fn list_memorials(&self) -> Result<Vec<Memorial>> {
        self.list("SELECT * FROM memorials ORDER BY id", row_to_memorial)
    }

    fn insert_memorial(&self, memorial: &NewMemorial) -> Result<Memorial> {
        let created_at = Self::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO memorials (name, years, date, note, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                memorial.name,
                memorial.years,
                format_date(&memorial.date),
                memorial.note,
                memorial.image_url,
                created_at.timestamp(),
            ],
        )
        .context("Failed to insert memorial")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted memorial {}", id);
        Ok(Memorial {
            id,
            name: memorial.name.clone(),
            years: memorial.years,
            date: memorial.date,
            note: memorial.note.clone(),
            image_url: memorial.image_url.clone(),
            created_at,
        })
    }

    fn list_torah_words(&self) -> Result<Vec<TorahWord>> {
        self.list("SELECT * FROM torah_words ORDER BY id", row_to_torah_word)
    }

    fn insert_torah_word(&self, torah_word: &NewTorahWord) -> Result<TorahWord> {
        let created_at = Self::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO torah_words (content, author, date, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                torah_word.content,
                torah_word.author,
                format_date(&torah_word.date),
                torah_word.image_url,
                created_at.timestamp(),
            ],
        )
        .context("Failed to insert torah word")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted torah word {}", id);
        Ok(TorahWord {
            id,
            content: torah_word.content.clone(),
            author: torah_word.author.clone(),
            date: torah_word.date,
            image_url: torah_word.image_url.clone(),
            created_at,
        })
    }

    fn list_announcements(&self) -> Result<Vec<Announcement>> {
        self.list("SELECT * FROM announcements ORDER BY id", row_to_announcement)
    }

    fn insert_announcement(&self, announcement: &NewAnnouncement) -> Result<Announcement> {
        let created_at = Self::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO announcements (title, content, priority, image_url, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                announcement.title,
                announcement.content,
                announcement.priority,
                announcement.image_url,
                announcement.start_date.to_rfc3339(),
                announcement.end_date.map(|dt| dt.to_rfc3339()),
                created_at.timestamp(),
            ],
        )
        .context("Failed to insert announcement")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted announcement {}", id);
        Ok(Announcement {
            id,
            title: announcement.title.clone(),
            content: announcement.content.clone(),
            priority: announcement.priority,
            image_url: announcement.image_url.clone(),
            start_date: announcement.start_date,
            end_date: announcement.end_date,
            created_at,
        })
    }

    fn list_shabbat_times(&self) -> Result<Vec<ShabbatTimes>> {
        self.list("SELECT * FROM shabbat_times ORDER BY id", row_to_shabbat_times)
    }

    fn insert_shabbat_times(&self, times: &NewShabbatTimes) -> Result<ShabbatTimes> {
        let created_at = Self::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO shabbat_times (candle_lighting, shabbat_ends, parsha, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                times.candle_lighting.to_string(),
                times.shabbat_ends.to_string(),
                times.parsha,
                format_date(&times.date),
                created_at.timestamp(),
            ],
        )
        .context("Failed to insert shabbat times")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted shabbat times {}", id);
        Ok(ShabbatTimes {
            id,
            candle_lighting: times.candle_lighting,
            shabbat_ends: times.shabbat_ends,
            parsha: times.parsha.clone(),
            date: times.date,
            created_at,
        })
    }

    fn list_prayer_times(&self) -> Result<Vec<PrayerTimes>> {
        self.list("SELECT * FROM prayer_times ORDER BY id", row_to_prayer_times)
    }

    fn insert_prayer_times(&self, times: &NewPrayerTimes) -> Result<PrayerTimes> {
        let created_at = Self::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO prayer_times (shacharit, mincha, maariv, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                times.shacharit.to_string(),
                times.mincha.to_string(),
                times.maariv.to_string(),
                format_date(&times.date),
                created_at.timestamp(),
            ],
        )
        .context("Failed to insert prayer times")?;
        let id = conn.last_insert_rowid();
        debug!("Inserted prayer times {}", id);
        Ok(PrayerTimes {
            id,
            shacharit: times.shacharit,
            mincha: times.mincha,
            maariv: times.maariv,
            date: times.date,
            created_at,
        })
    }

    fn delete(&self, kind: BoardKind, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1", kind.table_name()),
                params![id],
            )
            .with_context(|| format!("Failed to delete {} {}", kind.as_str(), id))?;
        Ok(deleted > 0)
    }

    fn count_records(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let mut total = 0usize;
        for kind in BoardKind::ALL {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", kind.table_name()),
                [],
                |row| row.get(0),
            )?;
            total += count as usize;
        }
        Ok(total)
    }
}

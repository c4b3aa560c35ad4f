//! SQLite schema definitions for the board database.
//!
//! Dates are stored as `YYYY-MM-DD` text, times of day as `HH:MM` text,
//! announcement windows as RFC 3339 text and creation timestamps as unix
//! seconds.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

// =============================================================================
// Version 1 - Board content
// =============================================================================

const LESSONS_TABLE_V1: Table = Table {
    name: "lessons",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("time", &SqlType::Text, non_null = true),
        sqlite_column!("rabbi", &SqlType::Text, non_null = true),
        sqlite_column!("date", &SqlType::Text, non_null = true),
        sqlite_column!(
            "recurring",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_lessons_date", "date")],
    unique_constraints: &[],
};

const MEMORIALS_TABLE_V1: Table = Table {
    name: "memorials",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("years", &SqlType::Integer, non_null = true),
        sqlite_column!("date", &SqlType::Text, non_null = true),
        sqlite_column!("note", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_memorials_date", "date")],
    unique_constraints: &[],
};

const TORAH_WORDS_TABLE_V1: Table = Table {
    name: "torah_words",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!("author", &SqlType::Text, non_null = true),
        sqlite_column!("date", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ANNOUNCEMENTS_TABLE_V1: Table = Table {
    name: "announcements",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("content", &SqlType::Text, non_null = true),
        sqlite_column!(
            "priority",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("1")
        ),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!("start_date", &SqlType::Text, non_null = true),
        sqlite_column!("end_date", &SqlType::Text),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_announcements_start", "start_date")],
    unique_constraints: &[],
};

const SHABBAT_TIMES_TABLE_V1: Table = Table {
    name: "shabbat_times",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("candle_lighting", &SqlType::Text, non_null = true),
        sqlite_column!("shabbat_ends", &SqlType::Text, non_null = true),
        sqlite_column!("parsha", &SqlType::Text, non_null = true),
        sqlite_column!("date", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_shabbat_times_date", "date")],
    unique_constraints: &[],
};

const PRAYER_TIMES_TABLE_V1: Table = Table {
    name: "prayer_times",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("shacharit", &SqlType::Text, non_null = true),
        sqlite_column!("mincha", &SqlType::Text, non_null = true),
        sqlite_column!("maariv", &SqlType::Text, non_null = true),
        sqlite_column!("date", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

pub const BOARD_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        LESSONS_TABLE_V1,
        MEMORIALS_TABLE_V1,
        TORAH_WORDS_TABLE_V1,
        ANNOUNCEMENTS_TABLE_V1,
        SHABBAT_TIMES_TABLE_V1,
        PRAYER_TIMES_TABLE_V1,
    ],
    migration: None,
}];

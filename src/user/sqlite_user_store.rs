use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::*;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};
use tracing::{debug, warn};

use super::auth::PasswordHasherKind;

/// V 1
const USER_TABLE_V_1: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "role",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'Gabbai'")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_1: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_1: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};

pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        USER_TABLE_V_1,
        AUTH_TOKEN_TABLE_V_1,
        USER_PASSWORD_CREDENTIALS_V_1,
    ],
    migration: None,
}];

fn epoch_secs_to_time(secs: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn time_to_epoch_secs(time: SystemTime) -> i64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

fn optional_time(row: &rusqlite::Row, column: &str) -> rusqlite::Result<Option<SystemTime>> {
    Ok(row.get::<_, Option<i64>>(column)?.map(epoch_secs_to_time))
}

fn read_auth_token(row: &rusqlite::Row) -> rusqlite::Result<AuthToken> {
    Ok(AuthToken {
        user_id: row.get("user_id")?,
        value: AuthTokenValue(row.get("value")?),
        created: epoch_secs_to_time(row.get("created")?),
        last_used: optional_time(row, "last_used")?,
    })
}

fn read_password_credentials(row: &rusqlite::Row) -> rusqlite::Result<UsernamePasswordCredentials> {
    let hasher_index = row.as_ref().column_index("hasher")?;
    let hasher = PasswordHasherKind::from_str(&row.get::<_, String>(hasher_index)?).map_err(
        |err| {
            rusqlite::Error::FromSqlConversionFailure(
                hasher_index,
                rusqlite::types::Type::Text,
                err.into(),
            )
        },
    )?;
    Ok(UsernamePasswordCredentials {
        user_id: row.get("user_id")?,
        salt: row.get("salt")?,
        hash: row.get("hash")?,
        hasher,
        created: epoch_secs_to_time(row.get("created")?),
        last_tried: optional_time(row, "last_tried")?,
        last_used: optional_time(row, "last_used")?,
    })
}

/// Gabbai accounts, their password credentials and their session tokens.
#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path, USER_VERSIONED_SCHEMAS)
            .context("Failed to open user database")?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        Ok(op(&conn)?)
    }

    fn lookup<T: rusqlite::types::FromSql>(
        &self,
        sql: &str,
        key: impl rusqlite::ToSql,
    ) -> Result<Option<T>> {
        self.with_conn(|conn| conn.query_row(sql, [key], |row| row.get(0)).optional())
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str, role: UserRole) -> Result<usize> {
        let id = self
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO user (handle, role) VALUES (?1, ?2)",
                    params![user_handle, role.as_str()],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(id as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        self.lookup("SELECT handle FROM user WHERE id = ?1", user_id)
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT handle FROM user ORDER BY id")?;
            let handles = stmt.query_map([], |row| row.get(0))?.collect();
            handles
        })
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        self.lookup("SELECT id FROM user WHERE handle = ?1", user_handle)
    }

    fn get_user_role(&self, user_id: usize) -> Result<Option<UserRole>> {
        let stored: Option<String> = self.lookup("SELECT role FROM user WHERE id = ?1", user_id)?;
        Ok(stored.and_then(|name| {
            let role = UserRole::from_str(&name);
            if role.is_none() {
                warn!("Ignoring unknown role '{}' of user {}", name, user_id);
            }
            role
        }))
    }

    fn set_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE user SET role = ?1 WHERE id = ?2",
                params![role.as_str(), user_id],
            )
        })?;
        if changed == 0 {
            anyhow::bail!("User {} not found", user_id);
        }
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM auth_token WHERE value = ?1",
                [&value.0],
                read_auth_token,
            )
            .optional()
        })
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let deleted = self.with_conn(|conn| {
            conn.query_row(
                "DELETE FROM auth_token WHERE value = ?1 RETURNING *",
                [&token.0],
                read_auth_token,
            )
            .optional()
        })?;
        if let Some(deleted) = &deleted {
            debug!("Revoked a session of user {}", deleted.user_id);
        }
        Ok(deleted)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE auth_token SET last_used = ?1 WHERE value = ?2",
                params![time_to_epoch_secs(SystemTime::now()), token.0],
            )
        })?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_token (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
                params![
                    token.user_id,
                    token.value.0,
                    time_to_epoch_secs(token.created),
                    token.last_used.map(time_to_epoch_secs),
                ],
            )
        })
        .with_context(|| format!("Failed to store session of user {}", token.user_id))?;
        Ok(())
    }

    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT auth_token.* FROM auth_token \
                 JOIN user ON user.id = auth_token.user_id \
                 WHERE user.handle = ?1 ORDER BY auth_token.created",
            )?;
            let tokens = stmt.query_map([user_handle], read_auth_token)?.collect();
            tokens
        })
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let Some(user_id) = self.get_user_id(user_handle)? else {
            return Ok(None);
        };
        let username_password = self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM user_password_credentials WHERE user_id = ?1",
                [user_id],
                read_password_credentials,
            )
            .optional()
        })?;
        Ok(Some(UserAuthCredentials {
            user_id,
            username_password,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let user_id = credentials.user_id;
        self.with_conn(|conn| match &credentials.username_password {
            Some(password) => conn.execute(
                "INSERT INTO user_password_credentials (user_id, salt, hash, hasher) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(user_id) DO UPDATE SET \
                 salt = excluded.salt, hash = excluded.hash, hasher = excluded.hasher",
                params![
                    user_id,
                    password.salt,
                    password.hash,
                    password.hasher.to_string()
                ],
            ),
            None => conn.execute(
                "DELETE FROM user_password_credentials WHERE user_id = ?1",
                [user_id],
            ),
        })
        .with_context(|| format!("Failed to update credentials of user {}", user_id))?;
        Ok(())
    }

    fn record_password_attempt(&self, user_id: usize, succeeded: bool) -> Result<()> {
        let sql = if succeeded {
            "UPDATE user_password_credentials SET last_tried = ?1, last_used = ?1 WHERE user_id = ?2"
        } else {
            "UPDATE user_password_credentials SET last_tried = ?1 WHERE user_id = ?2"
        };
        self.with_conn(|conn| {
            conn.execute(sql, params![time_to_epoch_secs(SystemTime::now()), user_id])
        })?;
        Ok(())
    }
}

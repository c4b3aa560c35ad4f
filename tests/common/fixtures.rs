//! Test data creation
//!
//! Creates the temporary databases each test server runs on.

use super::constants::*;
use anyhow::Result;
use shul_board_server::user::{SqliteUserStore, UserManager, UserRole};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Creates a temporary db dir whose user database holds a gabbai and a viewer.
pub fn create_test_db_with_users() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("user.db");
    let user_manager = UserManager::new(Arc::new(SqliteUserStore::new(&db_path)?));

    user_manager.add_user(GABBAI_USER, UserRole::Gabbai)?;
    user_manager.create_password_credentials(GABBAI_USER, GABBAI_PASS)?;

    user_manager.add_user(VIEWER_USER, UserRole::Viewer)?;
    user_manager.create_password_credentials(VIEWER_USER, VIEWER_PASS)?;

    Ok((dir, db_path))
}

/// A PNG signature padded with zeros to the requested length.
#[allow(dead_code)]
pub fn png_bytes(len: usize) -> Vec<u8> {
    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];
    let mut bytes = PNG_HEADER.to_vec();
    bytes.resize(len.max(PNG_HEADER.len()), 0);
    bytes
}

/// Tomorrow's UTC date as `YYYY-MM-DD`.
#[allow(dead_code)]
pub fn tomorrow_iso() -> String {
    (chrono::Utc::now().date_naive() + chrono::Days::new(1))
        .format("%Y-%m-%d")
        .to_string()
}

//! Shul Board Server Library
//!
//! This library exposes the internal modules for the binaries and for testing.

pub mod board_store;
pub mod calendar;
pub mod config;
pub mod display;
pub mod selection;
pub mod server;
pub mod sqlite_persistence;
pub mod uploads;
pub mod user;

// Re-export commonly used types for convenience
pub use board_store::{BoardStore, SqliteBoardStore};
pub use server::{run_server, RequestsLoggingLevel, ServerState};
pub use uploads::ImageUploadStore;
pub use user::{SqliteUserStore, UserManager, UserRole, UserStore};

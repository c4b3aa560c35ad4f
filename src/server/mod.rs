mod board_routes;
pub mod config;
pub mod error;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod session;
pub mod state;
mod upload;

pub use board_routes::{load_snapshot, BoardResponse, PollIntervals};
pub use config::{BoardSettings, HebcalSettings, ServerConfig};
pub use http_layers::*;
#[allow(unused_imports)] // Used by main.rs
pub use server::run_server;
pub use state::ServerState;
pub use upload::{UploadResponse, UPLOAD_FIELD_NAME};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shul_board_server::board_store::{seed_demo_content, BoardStore, SqliteBoardStore};
use shul_board_server::calendar::HebcalClient;
use shul_board_server::config::{AppConfig, CliConfig, FileConfig};
use shul_board_server::server::{self, run_server, RequestsLoggingLevel, ServerState};
use shul_board_server::uploads::ImageUploadStore;
use shul_board_server::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding board.db and user.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory for uploaded images. Defaults to <db-dir>/uploads.
    #[clap(long, value_parser = parse_path)]
    pub uploads_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Insert sample content if the board database is empty. No users are
    /// created; add a gabbai with cli-auth before logging in.
    #[clap(long)]
    pub seed_demo: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            uploads_dir: self.uploads_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(err) => tracing::error!("Failed to listen for Ctrl+C: {}", err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening board database at {:?}...",
        app_config.board_db_path()
    );
    let board_store = Arc::new(SqliteBoardStore::new(app_config.board_db_path())?);

    if cli_args.seed_demo {
        let today = app_config.board.moment_now().today;
        if seed_demo_content(board_store.as_ref(), today)? {
            info!("Seeded demo content, add a gabbai with cli-auth to edit it");
        }
    }

    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::set_board_records("total", board_store.count_records()?);

    info!("Opening user database at {:?}...", app_config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(app_config.user_db_path())?);
    let user_manager = UserManager::new(user_store).with_session_ttl(app_config.session_ttl);

    info!("Storing uploads in {:?}", app_config.uploads_dir);
    let upload_store =
        ImageUploadStore::new(app_config.uploads_dir.clone(), app_config.max_upload_bytes)
            .with_context(|| format!("Could not open uploads dir {:?}", app_config.uploads_dir))?;

    let mut state = ServerState::new(
        app_config.server_config(),
        board_store,
        user_manager,
        upload_store,
    );
    if let Some(hebcal) = &app_config.board.hebcal {
        info!("Hebcal lookup enabled for geonameid {}", hebcal.geonameid);
        let client = HebcalClient::new(&hebcal.base_url, &hebcal.geonameid, hebcal.timeout)?;
        state = state.with_shabbat_calendar(Arc::new(client));
    }

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);
    run_server(state, shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn seed_demo_help_mentions_user_setup() {
        let help = CliArgs::command().render_long_help().to_string();
        assert!(help.contains("--seed-demo"));
        assert!(help.contains("cli-auth"));
    }
}

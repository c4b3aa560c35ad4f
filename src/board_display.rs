//! Headless display client. Polls a board server and prints the board as JSON
//! whenever what it shows changes.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shul_board_server::config::{resolve_board_settings, FileConfig};
use shul_board_server::display::{spawn_pollers, BoardSource, DisplayFeed, HttpBoardSource};
use shul_board_server::selection::BoardView;

#[derive(Parser, Debug)]
struct CliArgs {
    /// Base URL of the board server.
    #[clap(long, default_value = "http://127.0.0.1:3001")]
    pub server_url: String,

    /// TOML config file. Only the [board] section is read.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Timeout of each request to the server, in seconds.
    #[clap(long, default_value_t = 10)]
    pub timeout_sec: u64,

    /// How often the board is recomputed from the local copy, in seconds.
    #[clap(long, default_value_t = 5)]
    pub render_interval_sec: u64,
}

fn print_view(view: &BoardView) {
    match serde_json::to_string_pretty(view) {
        Ok(json) => println!("{}", json),
        Err(err) => tracing::error!("Failed to serialize board: {}", err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let board_config = match &cli_args.config {
        Some(path) => FileConfig::load(path)?.board.unwrap_or_default(),
        None => Default::default(),
    };
    let settings = resolve_board_settings(board_config)?;

    let source: Arc<dyn BoardSource> = Arc::new(HttpBoardSource::new(
        &cli_args.server_url,
        Duration::from_secs(cli_args.timeout_sec),
    )?);
    let feed = Arc::new(DisplayFeed::new(settings));
    let shutdown = CancellationToken::new();
    let pollers = spawn_pollers(feed.clone(), source, shutdown.clone());
    info!("Displaying board of {}", cli_args.server_url);

    let mut render = tokio::time::interval(Duration::from_secs(cli_args.render_interval_sec.max(1)));
    let mut shown: Option<BoardView> = None;
    loop {
        tokio::select! {
            _ = render.tick() => {
                let view = feed.view_now();
                if shown.as_ref() != Some(&view) {
                    print_view(&view);
                    shown = Some(view);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    shutdown.cancel();
    let _ = pollers.shabbat_times.await;
    let _ = pollers.content.await;
    Ok(())
}

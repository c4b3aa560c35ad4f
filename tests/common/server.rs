//! One isolated board server per test: fresh databases, uploads dir and port.

use super::constants::*;
use super::fixtures::create_test_db_with_users;
use shul_board_server::board_store::SqliteBoardStore;
use shul_board_server::calendar::ShabbatCalendar;
use shul_board_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use shul_board_server::uploads::ImageUploadStore;
use shul_board_server::user::{SqliteUserStore, UserManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct TestServer {
    pub base_url: String,

    /// Where uploaded images land.
    #[allow(dead_code)]
    pub uploads_dir: PathBuf,

    _data_dir: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with_calendar(None).await
    }

    /// Spawns a server that consults `calendar` when no Shabbat times are stored.
    pub async fn spawn_with_calendar(calendar: Option<Arc<dyn ShabbatCalendar>>) -> Self {
        let (data_dir, user_db_path) =
            create_test_db_with_users().expect("Failed to create test database");

        let board_store = Arc::new(
            SqliteBoardStore::new(data_dir.path().join("board.db"))
                .expect("Failed to open board store"),
        );
        let user_manager = UserManager::new(Arc::new(
            SqliteUserStore::new(&user_db_path).expect("Failed to open user store"),
        ));
        let uploads_dir = data_dir.path().join("uploads");
        let upload_store = ImageUploadStore::new(uploads_dir.clone(), TEST_MAX_UPLOAD_BYTES)
            .expect("Failed to create uploads dir");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().expect("No local address").port();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
            ..ServerConfig::default()
        };
        let mut state = ServerState::new(config, board_store, user_manager, upload_store);
        if let Some(calendar) = calendar {
            state = state.with_shabbat_calendar(calendar);
        }
        let app = make_app(state).expect("Failed to build app");

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            uploads_dir,
            _data_dir: data_dir,
            shutdown: Some(shutdown),
        };
        server.wait_until_ready().await;
        server
    }

    async fn wait_until_ready(&self) {
        let client = reqwest::Client::new();
        let home = format!("{}/", self.base_url);
        let ready = async {
            loop {
                if let Ok(response) = client.get(&home).send().await {
                    if response.status().is_success() {
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
            }
        };
        tokio::time::timeout(Duration::from_millis(SERVER_READY_TIMEOUT_MS), ready)
            .await
            .expect("Server did not become ready");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

use axum::extract::FromRef;

use crate::board_store::BoardStore;
use crate::calendar::ShabbatCalendar;
use crate::uploads::ImageUploadStore;
use crate::user::UserManager;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::ServerConfig;

pub type GuardedBoardStore = Arc<dyn BoardStore>;
pub type GuardedUserManager = Arc<Mutex<UserManager>>;
pub type GuardedUploadStore = Arc<ImageUploadStore>;
pub type OptionalShabbatCalendar = Option<Arc<dyn ShabbatCalendar>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub board_store: GuardedBoardStore,
    pub user_manager: GuardedUserManager,
    pub upload_store: GuardedUploadStore,
    pub shabbat_calendar: OptionalShabbatCalendar,
    pub version: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        board_store: GuardedBoardStore,
        user_manager: UserManager,
        upload_store: ImageUploadStore,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            board_store,
            user_manager: Arc::new(Mutex::new(user_manager)),
            upload_store: Arc::new(upload_store),
            shabbat_calendar: None,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    pub fn with_shabbat_calendar(mut self, calendar: Arc<dyn ShabbatCalendar>) -> Self {
        self.shabbat_calendar = Some(calendar);
        self
    }
}

impl FromRef<ServerState> for GuardedBoardStore {
    fn from_ref(input: &ServerState) -> Self {
        input.board_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for GuardedUploadStore {
    fn from_ref(input: &ServerState) -> Self {
        input.upload_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

//! Board content routes: public reads through the selection rules and
//! gabbai-only create/delete.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::metrics::{record_board_mutation, set_board_records};
use super::session::Session;
use super::state::{GuardedBoardStore, ServerState};
use crate::board_store::{
    Announcement, AnnouncementPayload, BoardKind, BoardStore, Lesson, LessonPayload, Memorial,
    MemorialPayload, PrayerTimes, PrayerTimesPayload, ShabbatTimes, ShabbatTimesPayload,
    TorahWord, TorahWordPayload,
};
use crate::calendar::resolve_current_shabbat;
use crate::selection::{
    compose_board, order_lessons, order_memorials, order_torah_words,
    select_active_announcements, BoardSnapshot, BoardView, CurrentShabbatTimes, ShabbatSource,
};
use crate::user::Permission;

#[derive(Serialize, Debug)]
pub struct DeletedResponse {
    pub deleted: i64,
}

#[derive(Serialize, Debug)]
pub struct PollIntervals {
    pub shabbat_times_secs: u64,
    pub content_secs: u64,
}

#[derive(Serialize, Debug)]
pub struct BoardResponse {
    #[serde(flatten)]
    pub view: BoardView,
    pub poll_intervals: PollIntervals,
}

pub fn load_snapshot(store: &dyn BoardStore) -> anyhow::Result<BoardSnapshot> {
    Ok(BoardSnapshot {
        lessons: store.list_lessons()?,
        memorials: store.list_memorials()?,
        torah_words: store.list_torah_words()?,
        announcements: store.list_announcements()?,
        shabbat_times: store.list_shabbat_times()?,
    })
}

// =============================================================================
// Public reads
// =============================================================================

async fn get_lessons(State(board_store): State<GuardedBoardStore>) -> ApiResult<Json<Vec<Lesson>>> {
    Ok(Json(order_lessons(&board_store.list_lessons()?)))
}

async fn get_memorials(
    State(board_store): State<GuardedBoardStore>,
) -> ApiResult<Json<Vec<Memorial>>> {
    Ok(Json(order_memorials(&board_store.list_memorials()?)))
}

async fn get_torah_words(
    State(board_store): State<GuardedBoardStore>,
) -> ApiResult<Json<Vec<TorahWord>>> {
    Ok(Json(order_torah_words(&board_store.list_torah_words()?)))
}

async fn get_announcements(State(state): State<ServerState>) -> ApiResult<Json<Vec<Announcement>>> {
    let moment = state.config.board.moment_now();
    let records = state.board_store.list_announcements()?;
    Ok(Json(select_active_announcements(&moment, &records)))
}

async fn get_shabbat_times(State(state): State<ServerState>) -> ApiResult<Json<CurrentShabbatTimes>> {
    let moment = state.config.board.moment_now();
    let records = state.board_store.list_shabbat_times()?;
    Ok(Json(
        resolve_current_shabbat(
            &moment,
            &records,
            &state.config.board.default_shabbat,
            state.shabbat_calendar.as_deref(),
        )
        .await,
    ))
}

async fn get_all_shabbat_times(
    State(board_store): State<GuardedBoardStore>,
) -> ApiResult<Json<Vec<ShabbatTimes>>> {
    let mut records = board_store.list_shabbat_times()?;
    records.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    Ok(Json(records))
}

async fn get_prayer_times(
    State(board_store): State<GuardedBoardStore>,
) -> ApiResult<Json<Vec<PrayerTimes>>> {
    let mut records = board_store.list_prayer_times()?;
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    Ok(Json(records))
}

async fn get_board(State(state): State<ServerState>) -> ApiResult<Json<BoardResponse>> {
    let settings = &state.config.board;
    let moment = settings.moment_now();
    let snapshot = load_snapshot(state.board_store.as_ref())?;
    let mut view = compose_board(
        &moment,
        &snapshot,
        &settings.display_limits,
        &settings.default_shabbat,
    );
    if view.shabbat_times.source == ShabbatSource::Default {
        view.shabbat_times = resolve_current_shabbat(
            &moment,
            &snapshot.shabbat_times,
            &settings.default_shabbat,
            state.shabbat_calendar.as_deref(),
        )
        .await;
    }
    Ok(Json(BoardResponse {
        view,
        poll_intervals: PollIntervals {
            shabbat_times_secs: settings.shabbat_poll_interval.as_secs(),
            content_secs: settings.content_poll_interval.as_secs(),
        },
    }))
}

// =============================================================================
// Admin
// =============================================================================

async fn get_all_announcements(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
) -> ApiResult<Json<Vec<Announcement>>> {
    session.require(Permission::EditBoard)?;
    let mut records = board_store.list_announcements()?;
    records.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
    Ok(Json(records))
}

fn on_mutation(store: &dyn BoardStore, kind: BoardKind, operation: &str) {
    record_board_mutation(kind.as_str(), operation);
    match store.count_records() {
        Ok(count) => set_board_records("total", count),
        Err(err) => warn!("Could not count board records: {:#}", err),
    }
}

async fn post_lesson(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    payload: Result<Json<LessonPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    session.require(Permission::EditBoard)?;
    let Json(payload) = payload?;
    let lesson = board_store.insert_lesson(&payload.validate()?)?;
    on_mutation(board_store.as_ref(), BoardKind::Lesson, "create");
    Ok((StatusCode::CREATED, Json(lesson)))
}

async fn post_memorial(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    payload: Result<Json<MemorialPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Memorial>)> {
    session.require(Permission::EditBoard)?;
    let Json(payload) = payload?;
    let memorial = board_store.insert_memorial(&payload.validate()?)?;
    on_mutation(board_store.as_ref(), BoardKind::Memorial, "create");
    Ok((StatusCode::CREATED, Json(memorial)))
}

async fn post_torah_word(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    payload: Result<Json<TorahWordPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TorahWord>)> {
    session.require(Permission::EditBoard)?;
    let Json(payload) = payload?;
    let torah_word = board_store.insert_torah_word(&payload.validate()?)?;
    on_mutation(board_store.as_ref(), BoardKind::TorahWord, "create");
    Ok((StatusCode::CREATED, Json(torah_word)))
}

async fn post_announcement(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    payload: Result<Json<AnnouncementPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Announcement>)> {
    session.require(Permission::EditBoard)?;
    let Json(payload) = payload?;
    let announcement = board_store.insert_announcement(&payload.validate(chrono::Utc::now())?)?;
    on_mutation(board_store.as_ref(), BoardKind::Announcement, "create");
    Ok((StatusCode::CREATED, Json(announcement)))
}

async fn post_shabbat_times(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    payload: Result<Json<ShabbatTimesPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ShabbatTimes>)> {
    session.require(Permission::EditBoard)?;
    let Json(payload) = payload?;
    let times = board_store.insert_shabbat_times(&payload.validate()?)?;
    on_mutation(board_store.as_ref(), BoardKind::ShabbatTimes, "create");
    Ok((StatusCode::CREATED, Json(times)))
}

async fn post_prayer_times(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    payload: Result<Json<PrayerTimesPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PrayerTimes>)> {
    session.require(Permission::EditBoard)?;
    let Json(payload) = payload?;
    let times = board_store.insert_prayer_times(&payload.validate()?)?;
    on_mutation(board_store.as_ref(), BoardKind::PrayerTimes, "create");
    Ok((StatusCode::CREATED, Json(times)))
}

fn delete_record(
    session: &Session,
    board_store: &GuardedBoardStore,
    kind: BoardKind,
    raw_id: &str,
) -> ApiResult<Json<DeletedResponse>> {
    session.require(Permission::EditBoard)?;
    let id = raw_id.parse::<i64>().map_err(|_| ApiError::NotFound)?;
    if !board_store.delete(kind, id)? {
        debug!("No {} with id {}", kind.as_str(), id);
        return Err(ApiError::NotFound);
    }
    on_mutation(board_store.as_ref(), kind, "delete");
    Ok(Json(DeletedResponse { deleted: id }))
}

async fn delete_lesson(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    delete_record(&session, &board_store, BoardKind::Lesson, &id)
}

async fn delete_memorial(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    delete_record(&session, &board_store, BoardKind::Memorial, &id)
}

async fn delete_torah_word(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    delete_record(&session, &board_store, BoardKind::TorahWord, &id)
}

async fn delete_announcement(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    delete_record(&session, &board_store, BoardKind::Announcement, &id)
}

async fn delete_shabbat_times(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    delete_record(&session, &board_store, BoardKind::ShabbatTimes, &id)
}

async fn delete_prayer_times(
    session: Session,
    State(board_store): State<GuardedBoardStore>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    delete_record(&session, &board_store, BoardKind::PrayerTimes, &id)
}

/// Routes mounted under `/v1`.
pub fn make_board_routes(state: ServerState) -> Router {
    Router::new()
        .route("/board", get(get_board))
        .route("/lessons", get(get_lessons).post(post_lesson))
        .route("/lessons/{id}", delete(delete_lesson))
        .route("/memorials", get(get_memorials).post(post_memorial))
        .route("/memorials/{id}", delete(delete_memorial))
        .route("/torah-words", get(get_torah_words).post(post_torah_word))
        .route("/torah-words/{id}", delete(delete_torah_word))
        .route(
            "/announcements",
            get(get_announcements).post(post_announcement),
        )
        .route("/announcements/{id}", delete(delete_announcement))
        .route(
            "/shabbat-times",
            get(get_shabbat_times).post(post_shabbat_times),
        )
        .route("/shabbat-times/all", get(get_all_shabbat_times))
        .route("/shabbat-times/{id}", delete(delete_shabbat_times))
        .route("/prayer-times", get(get_prayer_times).post(post_prayer_times))
        .route("/prayer-times/{id}", delete(delete_prayer_times))
        .route("/admin/announcements", get(get_all_announcements))
        .with_state(state)
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::board_store::MockBoardStore;
    use crate::server::ServerConfig;
    use crate::uploads::ImageUploadStore;
    use crate::user::{SqliteUserStore, UserManager};
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn routes_over(store: MockBoardStore, dir: &TempDir) -> Router {
        let user_store = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        let upload_store = ImageUploadStore::new(dir.path().join("uploads"), 1024).unwrap();
        let state = ServerState::new(
            ServerConfig::default(),
            Arc::new(store),
            UserManager::new(user_store),
            upload_store,
        );
        make_board_routes(state)
    }

    #[tokio::test]
    async fn store_failure_is_a_generic_500() {
        let dir = TempDir::new().unwrap();
        let mut store = MockBoardStore::new();
        store
            .expect_list_lessons()
            .returning(|| Err(anyhow::anyhow!("disk on fire")));

        let response = routes_over(store, &dir)
            .oneshot(Request::builder().uri("/lessons").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn unauthenticated_delete_never_touches_store() {
        let dir = TempDir::new().unwrap();
        let mut store = MockBoardStore::new();
        store.expect_delete().never();

        let response = routes_over(store, &dir)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/lessons/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

use anyhow::Result;
use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{
    board_routes::make_board_routes,
    error::{ApiError, ApiResult},
    log_requests,
    metrics::{metrics_handler, record_login_attempt},
    session::{Session, COOKIE_SESSION_TOKEN_KEY},
    state::*,
    upload::make_upload_routes,
    with_login_rate_limit, LOGIN_PER_MINUTE,
};
use crate::uploads::UPLOADS_URL_PREFIX;
use crate::user::{AuthTokenValue, UserRole};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

impl std::fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginBody")
            .field("user_handle", &self.user_handle)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user_handle: String,
    role: UserRole,
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: state.version.clone(),
    };
    Json(stats)
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let start = Instant::now();
    let Json(body) = body?;
    debug!("login() called with {:?}", body);

    let locked_manager = user_manager.lock().unwrap();
    let token = match locked_manager.login(&body.user_handle, &body.password) {
        Ok(Some(token)) => token,
        Ok(None) => {
            record_login_attempt("failure", start.elapsed());
            return Err(ApiError::InvalidCredentials);
        }
        Err(err) => {
            error!("Error during login: {:#}", err);
            record_login_attempt("error", start.elapsed());
            return Err(ApiError::Storage(err));
        }
    };
    let max_age = time::Duration::seconds(locked_manager.session_ttl().as_secs() as i64);
    drop(locked_manager);
    record_login_attempt("success", start.elapsed());

    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, token.value.0.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build();

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginSuccessResponse {
            token: token.value.0,
        }),
    ))
}

async fn logout(
    State(user_manager): State<GuardedUserManager>,
    session: Session,
) -> ApiResult<impl IntoResponse> {
    user_manager
        .lock()
        .unwrap()
        .delete_auth_token(session.user_id, &AuthTokenValue(session.token))?;

    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

async fn get_session(session: Session) -> Json<SessionResponse> {
    Json(SessionResponse {
        user_handle: session.user_handle,
        role: session.role,
    })
}

pub fn make_app(state: ServerState) -> Result<Router> {
    let login_routes = with_login_rate_limit(
        Router::new().route("/login", post(login)),
        LOGIN_PER_MINUTE,
    )?;
    let auth_routes: Router = login_routes
        .route("/logout", get(logout))
        .route("/session", get(get_session))
        .with_state(state.clone());

    let v1_routes: Router = make_board_routes(state.clone())
        .merge(make_upload_routes(state.clone()))
        .nest("/auth", auth_routes);

    let home_router: Router = match &state.config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1", v1_routes)
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(state.upload_store.dir()));

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

/// Serves the board API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: tokio::net::TcpListener, state: ServerState, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = make_app(state)?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Metrics available on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the board API and the metrics endpoint until `shutdown` resolves
/// or either server fails.
pub async fn run_server<F>(state: ServerState, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Board server listening on port {}", port);

    tokio::select! {
        result = serve(listener, state, shutdown) => result,
        result = run_metrics_server(metrics_port) => result,
    }
}

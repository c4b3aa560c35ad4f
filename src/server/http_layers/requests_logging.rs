//! Request logging middleware. Also feeds the HTTP metrics.

use super::super::metrics::{normalize_path, record_http_request};
use super::super::session::{Session, HEADER_SESSION_TOKEN_KEY};
use super::super::state::ServerState;
use crate::board_store::BoardKind;
use axum::extract::{OptionalFromRequestParts, State};
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Method, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestClass {
    Read,
    Mutation(BoardKind),
    /// Image bytes, never logged.
    Upload,
    /// Carries a password in and a token out, never logged.
    Login,
}

impl RequestClass {
    fn of(method: &Method, path: &str) -> Self {
        let Some(route) = path.strip_prefix("/v1/") else {
            return RequestClass::Read;
        };
        match route {
            "upload" => return RequestClass::Upload,
            "auth/login" => return RequestClass::Login,
            _ => {}
        }
        if *method != Method::POST && *method != Method::DELETE {
            return RequestClass::Read;
        }
        let collection = route.split('/').next().unwrap_or_default();
        match collection_kind(collection) {
            Some(kind) => RequestClass::Mutation(kind),
            None => RequestClass::Read,
        }
    }

    fn logs_bodies(&self) -> bool {
        matches!(self, RequestClass::Read | RequestClass::Mutation(_))
    }
}

fn collection_kind(collection: &str) -> Option<BoardKind> {
    match collection {
        "lessons" => Some(BoardKind::Lesson),
        "memorials" => Some(BoardKind::Memorial),
        "torah-words" => Some(BoardKind::TorahWord),
        "announcements" => Some(BoardKind::Announcement),
        "shabbat-times" => Some(BoardKind::ShabbatTimes),
        "prayer-times" => Some(BoardKind::PrayerTimes),
        _ => None,
    }
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn is_secret_header(name: &header::HeaderName) -> bool {
    *name == header::COOKIE
        || *name == header::SET_COOKIE
        || name.as_str().eq_ignore_ascii_case(HEADER_SESSION_TOKEN_KEY)
}

fn log_headers(direction: &str, headers: &HeaderMap) {
    info!("  {} Headers:", direction);
    for (name, value) in headers.iter() {
        if is_secret_header(name) {
            info!("    {:?}: <redacted>", name);
        } else {
            info!("    {:?}: {:?}", name, value);
        }
    }
}

/// Buffers a small body so it can be logged. `None` when the body could not
/// be read.
async fn take_loggable_body(direction: &str, headers: &HeaderMap, body: Body) -> Option<Body> {
    match content_length(headers) {
        Some(size) if size < MAX_LOGGABLE_BODY_LENGTH => {
            let bytes: Bytes = match axum::body::to_bytes(body, size).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    error!("Failed to read {} body: {:?}", direction, err);
                    return None;
                }
            };
            info!("  {} Body:\n{}", direction, String::from_utf8_lossy(&bytes));
            Some(Body::from(bytes))
        }
        Some(size) => {
            info!(
                "  {} Body: too big to log ({:#})",
                direction,
                byte_unit::Byte::from(size)
            );
            Some(body)
        }
        None => {
            info!("  {} Body: no content length", direction);
            Some(body)
        }
    }
}

async fn acting_user(request: Request<Body>, state: &ServerState) -> (Request<Body>, String) {
    let (mut parts, body) = request.into_parts();
    let session =
        <Session as OptionalFromRequestParts<ServerState>>::from_request_parts(&mut parts, state)
            .await;
    let handle = match session {
        Ok(Some(session)) => session.user_handle,
        _ => "anonymous".to_string(),
    };
    (Request::from_parts(parts, body), handle)
}

pub async fn log_requests(
    State(state): State<ServerState>,
    mut request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let level = state.config.requests_logging_level.clone();
    let start = Instant::now();

    let method = request.method().clone();
    let uri = request.uri().to_string();
    let path = normalize_path(request.uri().path());
    let class = RequestClass::of(&method, request.uri().path());

    if level > RequestsLoggingLevel::None {
        match class {
            RequestClass::Mutation(kind) => {
                let (forwarded, user) = acting_user(request, &state).await;
                request = forwarded;
                info!(">>> {} {} [{} by {}]", method, uri, kind.as_str(), user);
            }
            RequestClass::Upload => {
                let size = content_length(request.headers()).unwrap_or(0);
                info!(">>> {} {} [upload {:#}]", method, uri, byte_unit::Byte::from(size));
            }
            _ => info!(">>> {} {}", method, uri),
        }
    }

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", request.headers());
    }

    if level >= RequestsLoggingLevel::Body && class.logs_bodies() {
        let (parts, body) = request.into_parts();
        let Some(body) = take_loggable_body("Req", &parts.headers, body).await else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        request = Request::from_parts(parts, body);
    }

    let mut response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", response.headers());
    }

    if level >= RequestsLoggingLevel::Body && class.logs_bodies() {
        let (parts, body) = response.into_parts();
        let Some(body) = take_loggable_body("Resp", &parts.headers, body).await else {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };
        response = Response::from_parts(parts, body);
    }

    let status = response.status().as_u16();
    let duration = start.elapsed();

    if level > RequestsLoggingLevel::None {
        info!("<<< {} ({}ms)", status, duration.as_millis());
    }

    record_http_request(method.as_str(), &path, status, duration);

    response
}

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection}, DefaultBodyLimit, Multipart,
        State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info};

use super::error::{ApiError, ApiResult};
use super::metrics::{record_upload, record_upload_rejection};
use super::session::Session;
use super::state::{GuardedUploadStore, ServerState};
use crate::uploads::{ImageUploadStore, UploadError};
use crate::user::Permission;

/// Name of the multipart field carrying the image.
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }.into()
    } else {
        ApiError::Validation(err.body_text())
    }
}

fn rejection_reason(err: &ApiError) -> &'static str {
    match err {
        ApiError::Upload(UploadError::NoFile) => "no_file",
        ApiError::Upload(UploadError::InvalidType) => "invalid_type",
        ApiError::Upload(UploadError::TooLarge { .. }) => "too_large",
        ApiError::Upload(UploadError::Io(_)) => "io",
        _ => "malformed",
    }
}

async fn receive_image(
    upload_store: &ImageUploadStore,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    let limit = upload_store.max_bytes();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
            if bytes.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge { limit }.into());
            }
            bytes.extend_from_slice(&chunk);
        }

        let stored = upload_store
            .store(file_name.as_deref(), content_type.as_deref(), &bytes)
            .await?;
        record_upload(stored.size);
        return Ok(UploadResponse {
            url: stored.url,
            filename: stored.filename,
        });
    }
    Err(UploadError::NoFile.into())
}

async fn upload_image(
    session: Session,
    State(upload_store): State<GuardedUploadStore>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    session.require(Permission::UploadImages)?;
    let multipart = multipart.map_err(|r| ApiError::Validation(r.body_text()))?;
    match receive_image(&upload_store, multipart).await {
        Ok(response) => {
            info!("{} uploaded {}", session.user_handle, response.filename);
            Ok(Json(response))
        }
        Err(err) => {
            record_upload_rejection(rejection_reason(&err));
            Err(err)
        }
    }
}

pub fn make_upload_routes(state: ServerState) -> Router {
    let body_limit = state.upload_store.max_bytes() + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route("/upload", post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

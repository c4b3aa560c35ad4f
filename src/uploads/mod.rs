//! Write-once storage for uploaded board images.

use rand::Rng;
use rand_distr::Alphanumeric;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

const RANDOM_SUFFIX_LEN: usize = 7;
const MAX_NAME_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Invalid file type")]
    InvalidType,

    #[error("File exceeds the maximum size of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub filename: String,
    pub url: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct ImageUploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageUploadStore {
    pub fn new<P: Into<PathBuf>>(dir: P, max_bytes: usize) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, max_bytes })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Checks both the declared content type and the sniffed bytes.
    pub fn check_image(declared_type: Option<&str>, bytes: &[u8]) -> Result<&'static str, UploadError> {
        let declared_ok = declared_type
            .map(|t| ALLOWED_IMAGE_TYPES.contains(&t.to_ascii_lowercase().as_str()))
            .unwrap_or(true);
        if !declared_ok {
            return Err(UploadError::InvalidType);
        }
        let sniffed = infer::get(bytes).ok_or(UploadError::InvalidType)?;
        ALLOWED_IMAGE_TYPES
            .iter()
            .find(|t| **t == sniffed.mime_type())
            .copied()
            .ok_or(UploadError::InvalidType)
    }

    /// Validates and stores an image, returning its public name and URL.
    pub async fn store(
        &self,
        original_name: Option<&str>,
        declared_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::NoFile);
        }
        if bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                limit: self.max_bytes,
            });
        }
        let mime = Self::check_image(declared_type, bytes)?;
        let extension = upload_extension(original_name, mime);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = generate_upload_name(&extension);
            let path = self.dir.join(&filename);
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match file {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Upload name {} already taken, retrying", filename);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            info!("Stored upload {} ({} bytes)", filename, bytes.len());
            return Ok(StoredUpload {
                url: format!("{}/{}", UPLOADS_URL_PREFIX, filename),
                filename,
                size: bytes.len(),
            });
        }
        Err(UploadError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "Could not find a free upload name",
        )))
    }
}

/// `<unix millis>-<random suffix><extension>`
pub fn generate_upload_name(extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}-{}{}", millis, suffix, extension)
}

/// Keeps the original extension when it is a plain short one, otherwise
/// derives it from the detected image type.
fn upload_extension(original_name: Option<&str>, mime: &str) -> String {
    let original = original_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match original {
        Some(ext) => format!(".{}", ext.to_ascii_lowercase()),
        None => match mime {
            "image/jpeg" => ".jpg",
            "image/png" => ".png",
            "image/gif" => ".gif",
            "image/webp" => ".webp",
            _ => "",
        }
        .to_string(),
    }
}

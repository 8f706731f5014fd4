use std::fmt;

use async_trait::async_trait;

use crate::error::AppError;

pub mod cloudinary;

pub use cloudinary::CloudinaryResolver;

/// Durable reference to an uploaded asset: the URL slides embed and the
/// opaque id used to delete the asset later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug)]
pub struct MediaError {
    message: String,
}

impl MediaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MediaError {}

impl From<MediaError> for AppError {
    fn from(error: MediaError) -> Self {
        tracing::error!("media resolver failure: {error}");
        AppError::InternalServerError(error.message)
    }
}

/// External media backend. The core never inspects asset bytes; it records
/// the URL and ref id the backend hands back and releases refs on deletion.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn upload(
        &self,
        file: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<MediaUpload, MediaError>;

    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Stands in when no media backend is configured. Deletion is a logged
/// no-op so stories whose slides carry plain URLs still delete cleanly.
pub struct NoopResolver;

#[async_trait]
impl MediaResolver for NoopResolver {
    async fn upload(
        &self,
        _file: Vec<u8>,
        _file_name: &str,
        _folder: &str,
    ) -> Result<MediaUpload, MediaError> {
        Err(MediaError::new("Media backend is not configured"))
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        tracing::warn!("media backend not configured, skipping delete of {public_id}");
        Ok(())
    }
}

//! Persistence of uploaded drawings.

mod local;

pub use local::LocalImageStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

pub const KEY_PREFIX: &str = "uploads";

const DEFAULT_EXTENSION: &str = "jpg";
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// Where an image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub key: String,
    /// Caller-facing location, e.g. `s3://bucket/uploads/...`.
    pub location: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredImage, StorageError>;
}

/// File extension and MIME type of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFormat {
    pub extension: &'static str,
    pub content_type: &'static str,
}

impl ImageFormat {
    /// Sniff the format from magic bytes; anything unrecognised is stored as JPEG.
    pub fn sniff(bytes: &[u8]) -> Self {
        match infer::get(bytes) {
            Some(kind) if kind.mime_type().starts_with("image/") => Self {
                extension: kind.extension(),
                content_type: kind.mime_type(),
            },
            _ => Self {
                extension: DEFAULT_EXTENSION,
                content_type: DEFAULT_CONTENT_TYPE,
            },
        }
    }
}

/// `uploads/<YYYYmmdd-HHMMSS>-<8 hex>.<ext>`
pub fn object_key<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R, extension: &str) -> String {
    format!(
        "{}/{}-{:08x}.{}",
        KEY_PREFIX,
        now.format("%Y%m%d-%H%M%S"),
        rng.random::<u32>(),
        extension
    )
}

pub fn new_object_key(extension: &str) -> String {
    object_key(Utc::now(), &mut rand::rng(), extension)
}

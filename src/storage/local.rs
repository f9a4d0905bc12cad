use super::{ImageStore, StorageError, StoredImage};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Stores images under a directory on the local filesystem.
pub struct LocalImageStore {
    root: PathBuf,
    location_prefix: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let location_prefix = format!("file://{}", root.display());
        Self {
            root,
            location_prefix,
        }
    }

    /// Report locations under another prefix, e.g. `s3://my-bucket`.
    pub fn with_location_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.location_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredImage, StorageError> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!(
            key,
            content_type,
            size = bytes.len(),
            "Stored uploaded image"
        );

        Ok(StoredImage {
            key: key.to_string(),
            location: format!("{}/{}", self.location_prefix, key),
        })
    }
}

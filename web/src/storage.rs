//! Filesystem object storage.
//!
//! Uploads are written under a root directory and addressed by a public base
//! URL under which that directory is served (the server binary mounts it at
//! `/uploads`; a CDN or reverse proxy works equally).

use roomly_core::error::{StoreError, StoreResult};
use roomly_core::repository::ObjectStorage;
use std::path::{Component, Path, PathBuf};

/// [`ObjectStorage`] backed by a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    /// Store files under `root`, published at `public_base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ObjectStorage for LocalObjectStorage {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> StoreResult<String> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(StoreError::Backend(format!("Invalid object path `{path}`")));
        }

        let target = self.root.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(format!("Failed to create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to write {}: {e}", target.display())))?;

        Ok(format!("{}/{path}", self.public_base_url))
    }
}

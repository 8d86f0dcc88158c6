//! Directory-backed blob store: one file per object under a bucket directory

use crate::error::RemoteError;
use crate::remote::{AccessControl, BlobStore, IntegrityToken, PutObject};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const META_DIR: &str = ".snapsync-meta";

/// Sidecar metadata written next to each object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    pub access: AccessControl,
    pub integrity: IntegrityToken,
    pub size: u64,
}

/// A bucket that lives in a local directory.
///
/// Writes go to a temporary file that is renamed into place, so readers see
/// either the old object or the new one.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// `root` is the storage directory; `bucket` becomes a subdirectory of it
    pub fn new(root: impl Into<PathBuf>, bucket: &str) -> Self {
        Self {
            root: root.into().join(bucket),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, RemoteError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            && !key.starts_with(META_DIR);
        if !valid {
            return Err(RemoteError::Transport {
                key: key.to_string(),
                message: "invalid object key".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{}.json", key))
    }

    /// Read the sidecar metadata for an object, if present
    pub fn meta(&self, key: &str) -> Result<Option<ObjectMeta>, RemoteError> {
        let path = self.meta_path(key);
        match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| RemoteError::Transport {
                    key: key.to_string(),
                    message: format!("invalid metadata: {}", e),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RemoteError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    fn write_atomic(key: &str, path: &Path, bytes: &[u8]) -> Result<(), RemoteError> {
        let io = |source| RemoteError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(format!(".tmp-{}", std::process::id()));
        let tmp = PathBuf::from(tmp_name);
        std::fs::write(&tmp, bytes).map_err(io)?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            io(e)
        })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        let path = self.object_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RemoteError::Io {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn put(&self, key: &str, object: PutObject) -> Result<(), RemoteError> {
        let path = self.object_path(key)?;
        object.integrity.verify(key, &object.body)?;

        let meta = ObjectMeta {
            content_type: object.content_type,
            access: object.access,
            integrity: object.integrity,
            size: object.body.len() as u64,
        };
        let meta_bytes = serde_json::to_vec_pretty(&meta).map_err(|e| RemoteError::Transport {
            key: key.to_string(),
            message: format!("failed to encode metadata: {}", e),
        })?;

        // Metadata only ever describes a stored body.
        Self::write_atomic(key, &path, &object.body)?;
        Self::write_atomic(key, &self.meta_path(key), &meta_bytes)?;
        debug!(key, bytes = meta.size, root = %self.root.display(), "Stored object");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}

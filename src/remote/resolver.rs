//! Remote state resolution: fetch the canonical snapshot and fingerprint it

use crate::error::SyncError;
use crate::fingerprint::{self, Fingerprint};
use crate::remote::BlobStore;
use tracing::{info, instrument};

/// A remote object and, once fetched, its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub key: String,
    /// `None` when the object does not exist
    pub fingerprint: Option<Fingerprint>,
}

impl SnapshotRef {
    pub fn absent(key: &str) -> Self {
        Self {
            key: key.to_string(),
            fingerprint: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.fingerprint.is_some()
    }
}

/// Resolves the fingerprint of a remote snapshot
pub struct RemoteStateResolver<'a> {
    store: &'a dyn BlobStore,
}

impl<'a> RemoteStateResolver<'a> {
    pub fn new(store: &'a dyn BlobStore) -> Self {
        Self { store }
    }

    /// Fetch `key` and fingerprint it.
    ///
    /// A missing object is the first-run case and resolves to an absent
    /// fingerprint. Transport failures and unreadable archives are errors.
    #[instrument(skip(self), fields(store = %self.store.describe()))]
    pub async fn resolve(&self, key: &str) -> Result<SnapshotRef, SyncError> {
        let bytes = match self.store.get(key).await? {
            Some(bytes) => bytes,
            None => {
                info!(key, "No remote snapshot yet");
                return Ok(SnapshotRef::absent(key));
            }
        };

        let fingerprint =
            fingerprint::compute_bytes(&bytes).map_err(|source| SyncError::Format {
                key: key.to_string(),
                source,
            })?;
        info!(key, bytes = bytes.len(), fingerprint = %fingerprint.short(), "Resolved remote snapshot");

        Ok(SnapshotRef {
            key: key.to_string(),
            fingerprint: Some(fingerprint),
        })
    }
}

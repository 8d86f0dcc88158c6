//! Versioned publisher: writes a snapshot to its versioned key and the canonical key

use crate::archive::Archive;
use crate::clock::format_capture_time;
use crate::error::{PublishError, RemoteError, SyncError};
use crate::fingerprint::Fingerprint;
use crate::remote::{AccessControl, BlobStore, IntegrityToken, PutObject, RemoteStateResolver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// Order of the two writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublishOrder {
    /// Versioned first; canonical only once history is durable
    #[default]
    HistoryFirst,
    /// Both writes issued together
    Concurrent,
}

/// Keys written by a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub canonical_key: String,
    pub versioned_key: String,
    pub capture_time: String,
}

/// Derive the versioned key for a capture time.
///
/// `saves/current.tar.gz` at 2024-01-02 03:04:05 becomes
/// `saves/current-2024-01-02 03:04:05.tar.gz`. The extension starts at the
/// first `.` of the last segment; a key without one gets the stamp appended.
pub fn versioned_key(canonical_key: &str, capture_time: &DateTime<Utc>) -> String {
    let stamp = format_capture_time(capture_time);
    let (dir, file) = match canonical_key.rfind('/') {
        Some(i) => canonical_key.split_at(i + 1),
        None => ("", canonical_key),
    };
    match file.find('.') {
        Some(i) if i > 0 => {
            let (base, ext) = file.split_at(i);
            format!("{}{}-{}{}", dir, base, stamp, ext)
        }
        _ => format!("{}{}-{}", dir, file, stamp),
    }
}

/// Publishes an archive to the canonical and versioned keys
pub struct VersionedPublisher<'a> {
    store: &'a dyn BlobStore,
    canonical_key: &'a str,
    order: PublishOrder,
    /// Canonical fingerprint observed at resolve time, re-checked before overwriting
    expected_canonical: Option<Option<Fingerprint>>,
}

impl<'a> VersionedPublisher<'a> {
    pub fn new(store: &'a dyn BlobStore, canonical_key: &'a str) -> Self {
        Self {
            store,
            canonical_key,
            order: PublishOrder::default(),
            expected_canonical: None,
        }
    }

    pub fn with_order(mut self, order: PublishOrder) -> Self {
        self.order = order;
        self
    }

    /// Fail with a conflict if canonical no longer has `expected` when it is about to be written
    pub fn with_conflict_check(mut self, expected: Option<Fingerprint>) -> Self {
        self.expected_canonical = Some(expected);
        self
    }

    /// Write `archive` to both keys.
    #[instrument(skip(self, archive, fingerprint), fields(canonical = self.canonical_key, order = ?self.order))]
    pub async fn publish(
        &self,
        archive: &Archive,
        fingerprint: &Fingerprint,
        capture_time: &DateTime<Utc>,
    ) -> Result<PublishOutcome, SyncError> {
        let versioned = versioned_key(self.canonical_key, capture_time);
        let outcome = PublishOutcome {
            canonical_key: self.canonical_key.to_string(),
            versioned_key: versioned.clone(),
            capture_time: format_capture_time(capture_time),
        };

        self.check_history_slot(&versioned, fingerprint).await?;

        match self.order {
            PublishOrder::HistoryFirst => {
                self.write(&versioned, archive, fingerprint)
                    .await
                    .map_err(|source| {
                        error!(key = %versioned, "Versioned write failed; canonical untouched");
                        PublishError::Versioned {
                            key: versioned.clone(),
                            source,
                        }
                    })?;
                info!(key = %versioned, "Stored versioned snapshot");

                if let Err(e) = self.check_conflict().await {
                    warn!(key = %versioned, "Versioned snapshot kept; canonical left as the other writer set it");
                    return Err(e);
                }

                self.write(self.canonical_key, archive, fingerprint)
                    .await
                    .map_err(|source| {
                        error!(key = self.canonical_key, "Canonical write failed after history was stored");
                        PublishError::Canonical {
                            key: self.canonical_key.to_string(),
                            versioned_key: versioned.clone(),
                            source,
                        }
                    })?;
                info!(key = self.canonical_key, "Updated canonical snapshot");
            }
            PublishOrder::Concurrent => {
                self.check_conflict().await?;

                let (versioned_result, canonical_result) = futures::future::join(
                    self.write(&versioned, archive, fingerprint),
                    self.write(self.canonical_key, archive, fingerprint),
                )
                .await;

                match (versioned_result, canonical_result) {
                    (Ok(()), Ok(())) => {
                        info!(versioned = %versioned, "Stored versioned and canonical snapshots");
                    }
                    (Err(versioned_err), Err(canonical_err)) => {
                        error!("Both snapshot writes failed");
                        return Err(PublishError::Both {
                            versioned: versioned_err,
                            canonical: canonical_err,
                        }
                        .into());
                    }
                    (Ok(()), Err(source)) => {
                        error!(key = self.canonical_key, "Canonical write failed");
                        return Err(PublishError::Canonical {
                            key: self.canonical_key.to_string(),
                            versioned_key: versioned,
                            source,
                        }
                        .into());
                    }
                    (Err(source), Ok(())) => {
                        warn!(key = %versioned, "Canonical advanced without its versioned copy");
                        return Err(PublishError::HistoryGap {
                            canonical_key: self.canonical_key.to_string(),
                            versioned_key: versioned,
                            source,
                        }
                        .into());
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn write(
        &self,
        key: &str,
        archive: &Archive,
        fingerprint: &Fingerprint,
    ) -> Result<(), RemoteError> {
        let object = PutObject {
            body: archive.shared_bytes(),
            content_type: archive.content_type().to_string(),
            access: AccessControl::Private,
            integrity: IntegrityToken::new(archive.as_bytes(), *fingerprint),
        };
        self.store.put(key, object).await
    }

    /// Two runs within one second map to the same versioned key; an existing
    /// object there is only overwritten with identical content.
    async fn check_history_slot(
        &self,
        versioned: &str,
        fingerprint: &Fingerprint,
    ) -> Result<(), SyncError> {
        let existing = RemoteStateResolver::new(self.store)
            .resolve(versioned)
            .await?;
        match existing.fingerprint {
            Some(found) if found != *fingerprint => {
                warn!(key = versioned, found = %found.short(), "History object already holds a different snapshot");
                Err(PublishError::HistoryCollision {
                    key: versioned.to_string(),
                    found: found.to_hex(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    async fn check_conflict(&self) -> Result<(), SyncError> {
        let expected = match &self.expected_canonical {
            Some(expected) => expected.as_ref(),
            None => return Ok(()),
        };
        let current = RemoteStateResolver::new(self.store)
            .resolve(self.canonical_key)
            .await?;
        if current.fingerprint.as_ref() != expected {
            warn!(key = self.canonical_key, "Canonical snapshot changed since it was resolved");
            return Err(SyncError::conflict(
                self.canonical_key,
                expected,
                current.fingerprint.as_ref(),
            ));
        }
        Ok(())
    }
}

//! Error types for the snapshot synchronization engine.

use crate::fingerprint::Fingerprint;
use std::path::PathBuf;
use thiserror::Error;

/// Archive construction and decoding errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed archive: {0}")]
    Format(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Blob-store transport errors
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request for '{key}' failed: {message}")]
    Transport { key: String, message: String },

    #[error("Access to '{key}' denied: {message}")]
    Auth { key: String, message: String },

    #[error("Integrity check failed for '{key}': {message}")]
    Integrity { key: String, message: String },

    #[error("Unexpected status {status} for '{key}'")]
    Status { key: String, status: u16 },

    #[error("Local store I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while writing the canonical and versioned snapshots
#[derive(Debug, Error)]
pub enum PublishError {
    /// The historical write failed; canonical was not touched.
    #[error("Versioned write to '{key}' failed (canonical untouched): {source}")]
    Versioned {
        key: String,
        #[source]
        source: RemoteError,
    },

    /// History is recorded but canonical still points at the previous snapshot.
    #[error("Canonical write to '{key}' failed after '{versioned_key}' was stored: {source}")]
    Canonical {
        key: String,
        versioned_key: String,
        #[source]
        source: RemoteError,
    },

    #[error("Both writes failed (versioned: {versioned}; canonical: {canonical})")]
    Both {
        versioned: RemoteError,
        canonical: RemoteError,
    },

    /// The versioned key for this capture time already holds other content.
    #[error("History object '{key}' already holds a different snapshot ({found}); nothing was written, re-run to publish under a new capture time")]
    HistoryCollision { key: String, found: String },

    /// Canonical advanced but its historical copy is missing.
    #[error("History incomplete: '{canonical_key}' updated but '{versioned_key}' failed: {source}")]
    HistoryGap {
        canonical_key: String,
        versioned_key: String,
        #[source]
        source: RemoteError,
    },
}

impl PublishError {
    /// True when the canonical pointer moved without a matching history entry.
    pub fn is_partial(&self) -> bool {
        matches!(self, PublishError::HistoryGap { .. })
    }
}

/// Top-level error for a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Remote snapshot '{key}' is unreadable: {source}")]
    Format {
        key: String,
        #[source]
        source: ArchiveError,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Canonical '{key}' changed during the run (expected {expected}, found {found}); re-run to resync")]
    Conflict {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl SyncError {
    pub(crate) fn conflict(
        key: &str,
        expected: Option<&Fingerprint>,
        found: Option<&Fingerprint>,
    ) -> Self {
        let show = |fp: Option<&Fingerprint>| match fp {
            Some(fp) => fp.to_hex(),
            None => "<absent>".to_string(),
        };
        SyncError::Conflict {
            key: key.to_string(),
            expected: show(expected),
            found: show(found),
        }
    }

    /// Process exit status for this failure.
    ///
    /// 3 marks a run whose history is incomplete; every other failure is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Publish(e) if e.is_partial() => 3,
            _ => 1,
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}

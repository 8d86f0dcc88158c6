//! Remote Blob Store
//!
//! The transport the engine consumes: authenticated get/put of named objects.
//! Implementations: in-memory (tests, dry experiments), a local directory
//! acting as a bucket, and an S3-style HTTP endpoint.

pub mod http;
pub mod local;
pub mod memory;
pub mod resolver;

pub use http::HttpBlobStore;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use resolver::{RemoteStateResolver, SnapshotRef};

use crate::error::RemoteError;
use crate::fingerprint::Fingerprint;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Object access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessControl {
    Private,
}

impl AccessControl {
    /// Canned ACL header value
    pub fn as_header_value(&self) -> &'static str {
        match self {
            AccessControl::Private => "private",
        }
    }
}

/// Integrity metadata attached to every write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityToken {
    /// Base64 SHA-256 of the exact object bytes, validated by the store
    pub sha256: String,
    /// Content fingerprint of the archive
    pub fingerprint: Fingerprint,
}

impl IntegrityToken {
    pub fn new(body: &[u8], fingerprint: Fingerprint) -> Self {
        Self {
            sha256: checksum(body),
            fingerprint,
        }
    }

    /// Check `body` against the recorded checksum
    pub fn verify(&self, key: &str, body: &[u8]) -> Result<(), RemoteError> {
        let actual = checksum(body);
        if actual == self.sha256 {
            Ok(())
        } else {
            Err(RemoteError::Integrity {
                key: key.to_string(),
                message: format!("expected sha256 {}, got {}", self.sha256, actual),
            })
        }
    }
}

/// Base64 SHA-256 digest, the form S3-style stores expect in checksum headers
pub fn checksum(body: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(body))
}

/// A write request for one object
#[derive(Debug, Clone)]
pub struct PutObject {
    /// Shared with the archive it came from
    pub body: Bytes,
    pub content_type: String,
    pub access: AccessControl,
    pub integrity: IntegrityToken,
}

/// Blob store transport
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch an object; `Ok(None)` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError>;

    /// Write an object, replacing any existing one atomically
    async fn put(&self, key: &str, object: PutObject) -> Result<(), RemoteError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

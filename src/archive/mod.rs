//! Snapshot Archive
//!
//! A source tree serialized as a single tar stream (optionally gzip-wrapped).
//! Entries are ordered by archive name and every header field that is not part
//! of the logical tree is pinned, so the same tree always yields the same bytes.

pub mod builder;
pub mod path;
pub mod walker;

pub use builder::ArchiveBuilder;
pub use walker::{Entry, Walker, WalkerConfig};

use crate::error::ArchiveError;
use bytes::Bytes;
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Container compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip { level: u32 },
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Gzip { level: 6 }
    }
}

impl Compression {
    /// Detect compression from the leading bytes of an archive
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&GZIP_MAGIC) {
            // Level is not recoverable from the stream and does not matter for reading.
            Compression::Gzip { level: 6 }
        } else {
            Compression::None
        }
    }

    /// MIME type for objects in this container
    pub fn content_type(&self) -> &'static str {
        match self {
            Compression::None => "application/x-tar",
            Compression::Gzip { .. } => "application/gzip",
        }
    }
}

/// An immutable, fully built archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub(crate) bytes: Bytes,
    pub(crate) compression: Compression,
    pub(crate) entry_count: usize,
    pub(crate) file_count: usize,
    pub(crate) content_bytes: u64,
}

impl Archive {
    /// Wrap archive bytes obtained elsewhere (a remote object, a file on disk).
    ///
    /// Entry statistics are unknown for foreign bytes and read as zero.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let compression = Compression::detect(&bytes);
        Self {
            bytes: Bytes::from(bytes),
            compression,
            entry_count: 0,
            file_count: 0,
            content_bytes: 0,
        }
    }

    /// Load an archive file from disk
    pub fn read_from(path: &Path) -> Result<Self, ArchiveError> {
        let bytes = std::fs::read(path).map_err(|e| ArchiveError::io(path, e))?;
        Ok(Self::from_bytes(bytes))
    }

    /// Persist the archive bytes to `path`
    pub fn write_to(&self, path: &Path) -> Result<(), ArchiveError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
            }
        }
        std::fs::write(path, &self.bytes).map_err(|e| ArchiveError::io(path, e))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A handle to the archive buffer; clones share one allocation
    pub fn shared_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        Vec::from(self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn content_type(&self) -> &'static str {
        self.compression.content_type()
    }

    /// Number of entries (directories and files) written
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Sum of file content sizes, before compression
    pub fn content_bytes(&self) -> u64 {
        self.content_bytes
    }
}

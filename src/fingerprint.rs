//! Content fingerprint of an archive using BLAKE3
//!
//! Fingerprint = hash over entries in archive order of
//! `kind || path_len || path || [content_len || content]`.
//!
//! Only the logical tree contributes: compression, header timestamps,
//! ownership and permission bits are never hashed.

use crate::archive::path::normalize_entry_name;
use crate::archive::walker::WalkerConfig;
use crate::archive::{Archive, ArchiveBuilder, Compression};
use crate::error::ArchiveError;
use blake3::Hasher;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tar::EntryType;
use tracing::{debug, instrument};

/// 32-byte BLAKE3 digest of an archive's logical contents
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(#[serde(with = "hex_bytes")] [u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex fingerprint
    pub fn from_hex(s: &str) -> Result<Self, ArchiveError> {
        let bytes = hex::decode(s)
            .map_err(|e| ArchiveError::Format(format!("Invalid fingerprint hex: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            ArchiveError::Format(format!("Fingerprint must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }

    /// First 12 hex characters, for logs and tables
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("fingerprint must be 32 bytes"))
    }
}

/// Fingerprint a built archive
pub fn compute(archive: &Archive) -> Result<Fingerprint, ArchiveError> {
    compute_bytes(archive.as_bytes())
}

/// Fingerprint raw archive bytes, gzip-wrapped or plain tar
#[instrument(skip(bytes), fields(archive_bytes = bytes.len()))]
pub fn compute_bytes(bytes: &[u8]) -> Result<Fingerprint, ArchiveError> {
    let fingerprint = match Compression::detect(bytes) {
        Compression::Gzip { .. } => digest_tar(GzDecoder::new(bytes))?,
        Compression::None => digest_tar(bytes)?,
    };
    debug!(fingerprint = %fingerprint.short(), "Computed fingerprint");
    Ok(fingerprint)
}

/// Build an in-memory archive of `root` and fingerprint it
pub fn of_directory(root: &Path, config: WalkerConfig) -> Result<Fingerprint, ArchiveError> {
    let archive = ArchiveBuilder::new(root.to_path_buf())
        .with_walker_config(config)
        .with_compression(Compression::None)
        .build()?;
    compute(&archive)
}

fn digest_tar<R: Read>(reader: R) -> Result<Fingerprint, ArchiveError> {
    let mut archive = tar::Archive::new(reader);
    let mut hasher = Hasher::new();

    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::Format(format!("Failed to read archive entries: {}", e)))?;

    let mut seen = 0usize;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| ArchiveError::Format(format!("Corrupt archive entry: {}", e)))?;
        seen += 1;

        let entry_type = entry.header().entry_type();
        let is_dir = match entry_type {
            EntryType::Directory => true,
            EntryType::Regular | EntryType::Continuous => false,
            other => {
                debug!(?other, "Skipping non-file archive entry");
                continue;
            }
        };

        let raw_path = entry
            .path()
            .map_err(|e| ArchiveError::Format(format!("Invalid entry path: {}", e)))?;
        let raw_path = raw_path.to_str().ok_or_else(|| {
            ArchiveError::Format(format!("Entry path is not valid UTF-8: {:?}", raw_path))
        })?;
        let name = normalize_entry_name(raw_path, is_dir);
        let name_bytes = name.as_bytes();

        if is_dir {
            hasher.update(b"dir");
            hasher.update(&(name_bytes.len() as u64).to_be_bytes());
            hasher.update(name_bytes);
            continue;
        }

        hasher.update(b"file");
        hasher.update(&(name_bytes.len() as u64).to_be_bytes());
        hasher.update(name_bytes);

        let size = entry.header().size().map_err(|e| {
            ArchiveError::Format(format!("Invalid size for entry '{}': {}", name, e))
        })?;
        hasher.update(&size.to_be_bytes());

        let copied = std::io::copy(&mut entry, &mut hasher).map_err(|e| {
            ArchiveError::Format(format!("Failed to read content of '{}': {}", name, e))
        })?;
        if copied != size {
            return Err(ArchiveError::Format(format!(
                "Truncated content for '{}': expected {} bytes, read {}",
                name, size, copied
            )));
        }
    }

    // Every built archive holds at least its root directory; an empty or
    // zero-filled object is not a snapshot.
    if seen == 0 {
        return Err(ArchiveError::Format(
            "Archive contains no entries".to_string(),
        ));
    }

    Ok(Fingerprint(*hasher.finalize().as_bytes()))
}

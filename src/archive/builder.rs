//! Archive builder: serializes a walked source tree into a deterministic tar stream

use crate::archive::walker::{Entry, Walker, WalkerConfig};
use crate::archive::{Archive, Compression};
use crate::error::ArchiveError;
use bytes::Bytes;
use flate2::GzBuilder;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tar::{EntryType, Header};
use tracing::{debug, error, info, instrument};

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

/// Archive builder for a single source tree
pub struct ArchiveBuilder {
    root: PathBuf,
    walker_config: Option<WalkerConfig>,
    compression: Compression,
}

impl ArchiveBuilder {
    /// Create a new archive builder for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            walker_config: None,
            compression: Compression::default(),
        }
    }

    /// Set walker config (ignore patterns, symlinks, depth)
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = Some(config);
        self
    }

    /// Set the container compression
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Build the archive.
    ///
    /// Either a complete archive is returned or an error naming the offending
    /// path; the partially written buffer is dropped on failure.
    #[instrument(skip(self), fields(source = %self.root.display()))]
    pub fn build(&self) -> Result<Archive, ArchiveError> {
        let start = Instant::now();
        info!("Starting archive build");

        let walker = match &self.walker_config {
            Some(config) => Walker::with_config(self.root.clone(), config.clone()),
            None => Walker::new(self.root.clone()),
        };
        let entries = match walker.walk() {
            Ok(e) => {
                debug!(entry_count = e.len(), "Walked source tree");
                e
            }
            Err(e) => {
                error!("Source walk failed: {}", e);
                return Err(e);
            }
        };

        let (bytes, stats) = match self.compression {
            Compression::None => {
                let mut tar = tar::Builder::new(Vec::new());
                let stats = append_entries(&mut tar, &entries)?;
                let bytes = tar.into_inner().map_err(|e| ArchiveError::io(&self.root, e))?;
                (bytes, stats)
            }
            Compression::Gzip { level } => {
                let encoder = GzBuilder::new()
                    .mtime(0)
                    .write(Vec::new(), flate2::Compression::new(level));
                let mut tar = tar::Builder::new(encoder);
                let stats = append_entries(&mut tar, &entries)?;
                let encoder = tar.into_inner().map_err(|e| ArchiveError::io(&self.root, e))?;
                let bytes = encoder.finish().map_err(|e| ArchiveError::io(&self.root, e))?;
                (bytes, stats)
            }
        };

        info!(
            entries = stats.entries,
            files = stats.files,
            content_bytes = stats.content_bytes,
            archive_bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Archive build complete"
        );

        Ok(Archive {
            bytes: Bytes::from(bytes),
            compression: self.compression,
            entry_count: stats.entries,
            file_count: stats.files,
            content_bytes: stats.content_bytes,
        })
    }
}

#[derive(Debug, Default)]
struct BuildStats {
    entries: usize,
    files: usize,
    content_bytes: u64,
}

fn append_entries<W: Write>(
    tar: &mut tar::Builder<W>,
    entries: &[Entry],
) -> Result<BuildStats, ArchiveError> {
    let mut stats = BuildStats::default();

    for entry in entries {
        match entry {
            Entry::Directory { path, name } => {
                let mut header = normalized_header(EntryType::Directory, DIR_MODE, 0);
                tar.append_data(&mut header, name, std::io::empty())
                    .map_err(|e| ArchiveError::io(path, e))?;
            }
            Entry::File { path, name, .. } => {
                // One file buffered at a time; the size recorded is what was read.
                let content = std::fs::read(path).map_err(|e| ArchiveError::io(path, e))?;
                let mut header =
                    normalized_header(EntryType::Regular, FILE_MODE, content.len() as u64);
                tar.append_data(&mut header, name, content.as_slice())
                    .map_err(|e| ArchiveError::io(path, e))?;
                stats.files += 1;
                stats.content_bytes += content.len() as u64;
            }
        }
        stats.entries += 1;
    }

    tar.finish().map_err(|e| ArchiveError::io("<archive>", e))?;
    Ok(stats)
}

/// Header with every field that is not part of the logical tree pinned.
fn normalized_header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

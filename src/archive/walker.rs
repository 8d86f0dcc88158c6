//! Filesystem walker for collecting a source tree in archive order

use crate::archive::path;
use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A file entry: absolute path, archive name, and size at walk time
    File {
        path: PathBuf,
        name: String,
        size: u64,
    },
    /// A directory entry: absolute path and archive name (with trailing `/`)
    Directory { path: PathBuf, name: String },
}

impl Entry {
    /// Archive name of this entry
    pub fn name(&self) -> &str {
        match self {
            Entry::File { name, .. } | Entry::Directory { name, .. } => name,
        }
    }

    /// Absolute filesystem path of this entry
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path, .. } | Entry::Directory { path, .. } => path,
        }
    }
}

/// Filesystem walker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    #[serde(default)]
    pub follow_symlinks: bool,
    /// Names to skip wherever they appear as a path component (e.g. ".git")
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Maximum depth below the source root (None = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Walk the filesystem and collect all entries, the root directory included.
    ///
    /// Returns entries sorted by archive name so the order does not depend on
    /// what the OS hands back.
    pub fn walk(&self) -> Result<Vec<Entry>, ArchiveError> {
        let (root, base) = path::resolve_root(&self.root)?;
        let metadata = std::fs::metadata(&root).map_err(|e| ArchiveError::io(&root, e))?;
        if !metadata.is_dir() {
            return Err(ArchiveError::io(
                &root,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "source root is not a directory",
                ),
            ));
        }

        let mut entries = Vec::new();

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_ignore(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let message = e.to_string();
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                let source = e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::Other, message)
                });
                ArchiveError::io(path, source)
            })?;

            let entry_path = entry.path().to_path_buf();
            let file_type = entry.file_type();

            if self.config.follow_symlinks && entry.path_is_symlink() {
                let target = dunce::canonicalize(&entry_path)
                    .map_err(|e| ArchiveError::io(&entry_path, e))?;
                if !target.starts_with(&root) {
                    return Err(ArchiveError::io(
                        &entry_path,
                        std::io::Error::new(
                            std::io::ErrorKind::PermissionDenied,
                            format!("symlink target {:?} escapes the source root", target),
                        ),
                    ));
                }
            }

            if file_type.is_dir() {
                let name = path::archive_name(&base, &entry_path, true)?;
                if name.is_empty() {
                    // Filesystem root: no name of its own
                    continue;
                }
                entries.push(Entry::Directory {
                    path: entry_path,
                    name,
                });
            } else if file_type.is_file() {
                let metadata = entry
                    .metadata()
                    .map_err(|e| ArchiveError::io(&entry_path, e.into()))?;
                let name = path::archive_name(&base, &entry_path, false)?;
                entries.push(Entry::File {
                    path: entry_path,
                    name,
                    size: metadata.len(),
                });
            } else {
                debug!(path = %entry_path.display(), "Skipping symlink or special file");
            }
        }

        entries.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(entries)
    }

    /// Check if an entry's own name matches an ignore pattern
    fn should_ignore(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore
            .iter()
            .any(|pattern| pattern.trim_end_matches('/') == name)
    }
}

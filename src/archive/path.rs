//! Archive entry naming: relative, `/`-separated, NFC-normalized paths

use crate::error::ArchiveError;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize the source root and pick the base that entry names are relative to.
///
/// Names are recorded relative to the root's parent, so the root directory's
/// own name becomes the top-level segment. A filesystem root has no parent and
/// is its own base.
pub fn resolve_root(root: &Path) -> Result<(PathBuf, PathBuf), ArchiveError> {
    let canonical = dunce::canonicalize(root).map_err(|e| ArchiveError::io(root, e))?;
    let base = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| canonical.clone());
    Ok((canonical, base))
}

/// Build the archive name for `path` relative to `base`.
///
/// Directories get a trailing `/`. Fails when the path is outside `base` or
/// has a component that is not valid UTF-8.
pub fn archive_name(base: &Path, path: &Path, is_dir: bool) -> Result<String, ArchiveError> {
    let relative = path.strip_prefix(base).map_err(|_| {
        ArchiveError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path escapes archive base {:?}", base),
            ),
        )
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    ArchiveError::io(
                        path,
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "file name is not valid UTF-8",
                        ),
                    )
                })?;
                segments.push(name.nfc().collect::<String>());
            }
            Component::CurDir => {}
            _ => {
                return Err(ArchiveError::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "unexpected path component",
                    ),
                ))
            }
        }
    }

    let mut name = segments.join("/");
    if is_dir && !name.is_empty() {
        name.push('/');
    }
    Ok(name)
}

/// Normalize a name read back from an archive header.
///
/// Separators become `/`, Unicode is NFC, and directories end with exactly one `/`.
pub fn normalize_entry_name(name: &str, is_dir: bool) -> String {
    let mut normalized: String = name.replace('\\', "/").nfc().collect();
    while normalized.ends_with('/') {
        normalized.pop();
    }
    if is_dir {
        normalized.push('/');
    }
    normalized
}

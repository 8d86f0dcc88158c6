//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::SyncError;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &SyncError) -> String {
    match e {
        SyncError::Publish(inner) if inner.is_partial() => {
            format!("error: {}\nhint: the canonical snapshot is current; rerun with --force to record history", e)
        }
        SyncError::Format { .. } => {
            format!("error: {}\nhint: use --force to overwrite the unreadable remote snapshot", e)
        }
        _ => format!("error: {}", e),
    }
}

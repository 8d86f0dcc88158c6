//! Sync decision: compare local and remote fingerprints

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing local and remote fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    NoChange,
    Publish,
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDecision::NoChange => f.write_str("no change"),
            SyncDecision::Publish => f.write_str("publish"),
        }
    }
}

/// `NoChange` iff the remote fingerprint is present and equal to the local one.
pub fn decide(local: &Fingerprint, remote: Option<&Fingerprint>) -> SyncDecision {
    match remote {
        Some(remote) if remote == local => SyncDecision::NoChange,
        _ => SyncDecision::Publish,
    }
}

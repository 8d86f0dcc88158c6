//! snapsync: Deterministic Snapshot Publishing
//!
//! Packs a directory tree into a byte-reproducible archive, fingerprints its
//! logical content, compares that against the snapshot already stored under a
//! canonical key, and when they differ publishes the new archive both as a
//! timestamped history object and as the canonical object.

pub mod archive;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod remote;
pub mod sync;

//! Shared fixtures for integration tests

use chrono::{TimeZone, Utc};
use snapsync::clock::FixedClock;
use snapsync::remote::BlobStore;
use snapsync::sync::{SyncEngine, SyncSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const CANONICAL: &str = "current-save.tar.gz";

/// A temp dir holding `saves/` with two files and a nested directory.
pub fn save_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("saves");
    fs::create_dir_all(root.join("slot2")).unwrap();
    fs::write(root.join("slot1.sav"), "level 3, 120 coins").unwrap();
    fs::write(root.join("slot2").join("state.bin"), [0u8, 1, 2, 3, 255]).unwrap();
    (temp_dir, root)
}

pub fn clock_at(h: u32, m: u32, s: u32) -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 3, 15, h, m, s).unwrap())
}

pub fn engine_at(root: &Path, store: Arc<dyn BlobStore>, clock: FixedClock) -> SyncEngine {
    SyncEngine::new(
        SyncSettings::new(root.to_path_buf(), CANONICAL),
        store,
        Arc::new(clock),
    )
}

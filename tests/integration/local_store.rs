//! Integration tests for syncing into a directory-backed bucket

use crate::integration::test_utils::{clock_at, engine_at, save_dir, CANONICAL};
use snapsync::fingerprint;
use snapsync::remote::{AccessControl, LocalBlobStore};
use snapsync::sync::{SyncDecision, SyncOptions};
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn test_sync_into_local_bucket() {
    let (temp, root) = save_dir();
    let store = LocalBlobStore::new(temp.path().join("store"), "game-saves");

    let report = engine_at(&root, Arc::new(store.clone()), clock_at(8, 15, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(report.decision, SyncDecision::Publish);

    let bucket = temp.path().join("store").join("game-saves");
    let canonical = fs::read(bucket.join(CANONICAL)).unwrap();
    let versioned = fs::read(bucket.join("current-save-2024-03-15 08:15:00.tar.gz")).unwrap();
    assert_eq!(canonical, versioned);
    assert_eq!(
        fingerprint::compute_bytes(&canonical).unwrap(),
        report.local_fingerprint
    );

    let meta = store.meta(CANONICAL).unwrap().unwrap();
    assert_eq!(meta.access, AccessControl::Private);
    assert_eq!(meta.content_type, "application/gzip");
    assert_eq!(meta.size, canonical.len() as u64);
    assert_eq!(meta.integrity.fingerprint, report.local_fingerprint);
}

#[tokio::test]
async fn test_local_bucket_second_run_noop() {
    let (temp, root) = save_dir();
    let store = LocalBlobStore::new(temp.path().join("store"), "game-saves");

    engine_at(&root, Arc::new(store.clone()), clock_at(8, 15, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    let report = engine_at(&root, Arc::new(store.clone()), clock_at(9, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.decision, SyncDecision::NoChange);
    assert!(!temp
        .path()
        .join("store")
        .join("game-saves")
        .join("current-save-2024-03-15 09:00:00.tar.gz")
        .exists());
}

/// A canonical key with a directory prefix lands in a subdirectory
#[tokio::test]
async fn test_nested_canonical_key() {
    let (temp, root) = save_dir();
    let store = LocalBlobStore::new(temp.path().join("store"), "b");
    let engine = snapsync::sync::SyncEngine::new(
        snapsync::sync::SyncSettings::new(root, "games/zelda/current.tar.gz"),
        Arc::new(store),
        Arc::new(clock_at(1, 2, 3)),
    );

    let report = engine.run(&SyncOptions::default()).await.unwrap();

    assert_eq!(
        report.versioned_key.as_deref(),
        Some("games/zelda/current-2024-03-15 01:02:03.tar.gz")
    );
    let dir = temp.path().join("store").join("b").join("games").join("zelda");
    assert!(dir.join("current.tar.gz").exists());
    assert!(dir.join("current-2024-03-15 01:02:03.tar.gz").exists());
}

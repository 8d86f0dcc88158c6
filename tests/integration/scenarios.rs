//! End-to-end sync scenarios against an in-memory store

use crate::integration::test_utils::{clock_at, engine_at, save_dir, CANONICAL};
use snapsync::error::{PublishError, SyncError};
use snapsync::remote::MemoryBlobStore;
use snapsync::sync::{SyncDecision, SyncOptions};
use std::fs;
use std::sync::Arc;

/// First run against an empty bucket publishes both keys
#[tokio::test]
async fn test_first_run_publishes_versioned_then_canonical() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    let report = engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.decision, SyncDecision::Publish);
    assert_eq!(
        store.put_log(),
        vec![
            "current-save-2024-03-15 10:00:00.tar.gz".to_string(),
            CANONICAL.to_string(),
        ]
    );
    let canonical = store.object(CANONICAL).unwrap();
    let versioned = store.object("current-save-2024-03-15 10:00:00.tar.gz").unwrap();
    assert_eq!(canonical.body, versioned.body);
    assert_eq!(canonical.content_type, "application/gzip");
}

/// Unchanged source: only the canonical object is read, nothing is written
#[tokio::test]
async fn test_unchanged_rerun_is_noop() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    let report = engine_at(&root, Arc::new(store.clone()), clock_at(11, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.decision, SyncDecision::NoChange);
    assert_eq!(report.remote_fingerprint, Some(report.local_fingerprint));
    assert_eq!(store.put_log().len(), 2);
    assert_eq!(store.keys().len(), 2);
}

/// Touching a file without changing it does not trigger a publish
#[tokio::test]
async fn test_rewrite_with_same_content_is_noop() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    fs::write(root.join("slot1.sav"), "level 3, 120 coins").unwrap();

    let report = engine_at(&root, Arc::new(store.clone()), clock_at(10, 5, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(report.decision, SyncDecision::NoChange);
}

/// A content change publishes a new versioned object and keeps the old one
#[tokio::test]
async fn test_content_change_adds_history() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    let first = engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    fs::write(root.join("slot1.sav"), "level 4, 80 coins").unwrap();
    let second = engine_at(&root, Arc::new(store.clone()), clock_at(12, 30, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(second.decision, SyncDecision::Publish);
    assert_eq!(second.remote_fingerprint, Some(first.local_fingerprint));
    assert_ne!(second.local_fingerprint, first.local_fingerprint);
    assert_eq!(
        store.keys(),
        vec![
            "current-save-2024-03-15 10:00:00.tar.gz".to_string(),
            "current-save-2024-03-15 12:30:00.tar.gz".to_string(),
            CANONICAL.to_string(),
        ]
    );
    assert_eq!(
        store.object(CANONICAL).unwrap().body,
        store
            .object("current-save-2024-03-15 12:30:00.tar.gz")
            .unwrap()
            .body
    );
}

/// Adding an empty directory is a content change
#[tokio::test]
async fn test_new_empty_directory_triggers_publish() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    fs::create_dir(root.join("slot3")).unwrap();

    let report = engine_at(&root, Arc::new(store.clone()), clock_at(10, 1, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(report.decision, SyncDecision::Publish);
}

/// An empty source directory still produces a publishable snapshot
#[tokio::test]
async fn test_empty_source_publishes_once() {
    let temp = tempfile::TempDir::new().unwrap();
    let root = temp.path().join("empty");
    fs::create_dir(&root).unwrap();
    let store = MemoryBlobStore::new();

    let first = engine_at(&root, Arc::new(store.clone()), clock_at(9, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    let second = engine_at(&root, Arc::new(store.clone()), clock_at(9, 1, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(first.decision, SyncDecision::Publish);
    assert_eq!(first.files, 0);
    assert_eq!(second.decision, SyncDecision::NoChange);
}

/// Two changed snapshots captured in the same second never replace recorded history
#[tokio::test]
async fn test_same_second_change_preserves_history() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    let recorded = store
        .object("current-save-2024-03-15 10:00:00.tar.gz")
        .unwrap()
        .body;
    fs::write(root.join("slot1.sav"), "level 4, 80 coins").unwrap();

    let err = engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 0))
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::Publish(PublishError::HistoryCollision { .. })
    ));
    assert_eq!(store.put_log().len(), 2);
    assert_eq!(
        store
            .object("current-save-2024-03-15 10:00:00.tar.gz")
            .unwrap()
            .body,
        recorded
    );

    let retried = engine_at(&root, Arc::new(store.clone()), clock_at(10, 0, 1))
        .run(&SyncOptions::default())
        .await
        .unwrap();
    assert_eq!(retried.decision, SyncDecision::Publish);
    assert_eq!(store.keys().len(), 3);
}

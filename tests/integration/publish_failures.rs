//! Integration tests for partial publish failures and conflicts

use crate::integration::test_utils::{clock_at, save_dir, CANONICAL};
use snapsync::archive::ArchiveBuilder;
use snapsync::clock::FixedClock;
use snapsync::error::{PublishError, RemoteError, SyncError};
use snapsync::remote::MemoryBlobStore;
use snapsync::sync::{PublishOrder, SyncEngine, SyncOptions, SyncSettings};
use std::fs;
use std::sync::Arc;

const VERSIONED: &str = "current-save-2024-03-15 10:00:00.tar.gz";

fn engine(root: &std::path::Path, store: &MemoryBlobStore, order: PublishOrder) -> SyncEngine {
    let mut settings = SyncSettings::new(root.to_path_buf(), CANONICAL);
    settings.publish_order = order;
    SyncEngine::new(settings, Arc::new(store.clone()), Arc::new(clock_at(10, 0, 0)))
}

/// History-first: a failed versioned write leaves canonical untouched
#[tokio::test]
async fn test_versioned_failure_leaves_canonical_untouched() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    store.fail_puts_to(VERSIONED);

    let err = engine(&root, &store, PublishOrder::HistoryFirst)
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Publish(PublishError::Versioned { .. })));
    assert_eq!(err.exit_code(), 1);
    assert!(store.put_log().is_empty());
    assert!(store.object(CANONICAL).is_none());
}

/// History-first: canonical failure after history was stored is reported with both keys
#[tokio::test]
async fn test_canonical_failure_after_history() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    store.fail_puts_to(CANONICAL);

    let err = engine(&root, &store, PublishOrder::HistoryFirst)
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    match err {
        SyncError::Publish(PublishError::Canonical {
            ref key,
            ref versioned_key,
            ..
        }) => {
            assert_eq!(key, CANONICAL);
            assert_eq!(versioned_key, VERSIONED);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.put_log(), vec![VERSIONED.to_string()]);
}

/// Concurrent: canonical landing without history is a distinct, partial outcome
#[tokio::test]
async fn test_concurrent_history_gap() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    store.fail_puts_to(VERSIONED);

    let err = engine(&root, &store, PublishOrder::Concurrent)
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Publish(PublishError::HistoryGap { .. })));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(store.put_log(), vec![CANONICAL.to_string()]);
}

/// Concurrent: both writes failing reports both causes
#[tokio::test]
async fn test_concurrent_both_fail() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    store.fail_puts_to("current-save*");

    let err = engine(&root, &store, PublishOrder::Concurrent)
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    match err {
        SyncError::Publish(PublishError::Both {
            versioned: RemoteError::Transport { key: v, .. },
            canonical: RemoteError::Transport { key: c, .. },
        }) => {
            assert_eq!(v, VERSIONED);
            assert_eq!(c, CANONICAL);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// A transport failure reading canonical aborts before any write
#[tokio::test]
async fn test_remote_read_failure_is_fatal() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    store.fail_gets_from(CANONICAL);

    let err = engine(&root, &store, PublishOrder::HistoryFirst)
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Remote(RemoteError::Transport { .. })));
    assert!(store.put_log().is_empty());
}

/// An unreadable canonical object is a format error; --force overwrites it
#[tokio::test]
async fn test_unreadable_remote_needs_force() {
    let (_temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    store.insert(CANONICAL, b"PK\x03\x04 legacy zip".to_vec());
    let engine = engine(&root, &store, PublishOrder::HistoryFirst);

    let err = engine.run(&SyncOptions::default()).await.unwrap_err();
    assert!(matches!(err, SyncError::Format { ref key, .. } if key == CANONICAL));
    assert!(store.put_log().is_empty());

    let forced = engine
        .run(&SyncOptions {
            force: true,
            ..SyncOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(forced.writes.len(), 2);
    assert_ne!(store.object(CANONICAL).unwrap().body, b"PK\x03\x04 legacy zip".to_vec());
}

/// Another writer replacing canonical between resolve and publish is detected
#[tokio::test]
async fn test_concurrent_writer_conflict() {
    let (temp, root) = save_dir();
    let store = MemoryBlobStore::new();

    let other_root = temp.path().join("other").join("saves");
    fs::create_dir_all(&other_root).unwrap();
    fs::write(other_root.join("slot1.sav"), "someone else's progress").unwrap();
    let other = ArchiveBuilder::new(other_root).build().unwrap();
    store.race_after_put(VERSIONED, CANONICAL, other.into_bytes());

    let err = engine(&root, &store, PublishOrder::HistoryFirst)
        .run(&SyncOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Conflict { ref key, .. } if key == CANONICAL));
    assert_eq!(store.put_log(), vec![VERSIONED.to_string()]);
}

/// With the check disabled the last writer wins
#[tokio::test]
async fn test_conflict_check_can_be_disabled() {
    let (temp, root) = save_dir();
    let store = MemoryBlobStore::new();
    let other_root = temp.path().join("other").join("saves");
    fs::create_dir_all(&other_root).unwrap();
    fs::write(other_root.join("slot1.sav"), "someone else's progress").unwrap();
    store.race_after_put(
        VERSIONED,
        CANONICAL,
        ArchiveBuilder::new(other_root).build().unwrap().into_bytes(),
    );

    let mut settings = SyncSettings::new(root, CANONICAL);
    settings.check_conflicts = false;
    let clock: FixedClock = clock_at(10, 0, 0);
    let report = SyncEngine::new(settings, Arc::new(store.clone()), Arc::new(clock))
        .run(&SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(report.writes.len(), 2);
    assert_eq!(
        store.object(CANONICAL).unwrap().body,
        store.object(VERSIONED).unwrap().body
    );
}

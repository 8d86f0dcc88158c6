//! Property-based tests for the sync decision and versioned keys

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use snapsync::fingerprint::Fingerprint;
use snapsync::sync::{decide, versioned_key, SyncDecision};

/// Publish exactly when the remote fingerprint is absent or different
#[test]
fn test_decision_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(any::<[u8; 32]>(), prop::option::of(any::<[u8; 32]>())),
            |(local, remote)| {
                let local = Fingerprint::from_bytes(local);
                let remote = remote.map(Fingerprint::from_bytes);
                let decision = decide(&local, remote.as_ref());

                let expected = if remote == Some(local) {
                    SyncDecision::NoChange
                } else {
                    SyncDecision::Publish
                };
                prop_assert_eq!(decision, expected);
                prop_assert_eq!(decide(&local, Some(&local)), SyncDecision::NoChange);
                Ok(())
            },
        )
        .unwrap();
}

/// Versioned keys keep the directory and extension and differ per second
#[test]
fn test_versioned_key_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::option::of("[a-z]{1,6}"),
                "[a-z][a-z_]{0,10}",
                prop::option::of("(\\.tar)?\\.(gz|zip)"),
                0i64..2_000_000_000,
            ),
            |(dir, base, ext, secs)| {
                let ext = ext.unwrap_or_default();
                let prefix = dir.map(|d| format!("{}/", d)).unwrap_or_default();
                let canonical = format!("{}{}{}", prefix, base, ext);
                let t1 = Utc.timestamp_opt(secs, 0).unwrap();
                let t2 = Utc.timestamp_opt(secs + 1, 0).unwrap();

                let k1 = versioned_key(&canonical, &t1);
                let k2 = versioned_key(&canonical, &t2);

                let expected_prefix = format!("{}{}-", prefix, base);
                prop_assert!(k1.starts_with(&expected_prefix));
                prop_assert!(k1.ends_with(&ext));
                prop_assert_ne!(&k1, &canonical);
                prop_assert_ne!(k1, k2);
                Ok(())
            },
        )
        .unwrap();
}

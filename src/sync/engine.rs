//! Sync engine: one run of build, resolve, decide, and (maybe) publish

use crate::archive::{Archive, ArchiveBuilder, Compression, WalkerConfig};
use crate::clock::{format_capture_time, Clock};
use crate::error::SyncError;
use crate::fingerprint::{self, Fingerprint};
use crate::remote::{BlobStore, RemoteStateResolver, SnapshotRef};
use crate::sync::decision::{decide, SyncDecision};
use crate::sync::publisher::{versioned_key, PublishOrder, VersionedPublisher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Everything the engine needs to know about one source and one canonical object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub source_root: PathBuf,
    pub canonical_key: String,
    pub walker: WalkerConfig,
    pub compression: Compression,
    pub publish_order: PublishOrder,
    pub check_conflicts: bool,
}

impl SyncSettings {
    pub fn new(source_root: PathBuf, canonical_key: &str) -> Self {
        Self {
            source_root,
            canonical_key: canonical_key.to_string(),
            walker: WalkerConfig::default(),
            compression: Compression::default(),
            publish_order: PublishOrder::default(),
            check_conflicts: true,
        }
    }
}

/// Per-run switches
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Decide but never write
    pub dry_run: bool,
    /// Skip remote resolution and publish unconditionally
    pub force: bool,
    /// Also write the local archive here
    pub keep_archive: Option<PathBuf>,
}

/// What one run saw and did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub decision: SyncDecision,
    pub local_fingerprint: Fingerprint,
    pub remote_fingerprint: Option<Fingerprint>,
    pub canonical_key: String,
    /// Versioned key for this capture time when the decision is `Publish`
    pub versioned_key: Option<String>,
    pub capture_time: String,
    pub archive_bytes: u64,
    pub entries: usize,
    pub files: usize,
    pub content_bytes: u64,
    /// Keys actually written, in order
    pub writes: Vec<String>,
    pub dry_run: bool,
    pub forced: bool,
}

/// Snapshot synchronization engine
pub struct SyncEngine {
    settings: SyncSettings,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
}

impl SyncEngine {
    pub fn new(settings: SyncSettings, store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            store,
            clock,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run the pipeline once.
    ///
    /// The archive build runs on the blocking pool while the canonical object
    /// is fetched; both finish before the decision is made.
    #[instrument(skip(self, options), fields(
        source = %self.settings.source_root.display(),
        canonical = %self.settings.canonical_key,
        store = %self.store.describe(),
    ))]
    pub async fn run(&self, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let capture_time = self.clock.now();
        let canonical_key = self.settings.canonical_key.as_str();

        let build = self.spawn_build();
        let (archive, local, remote) = if options.force {
            let (archive, local) = join_build(build.await)?;
            (archive, local, SnapshotRef::absent(canonical_key))
        } else {
            let resolver = RemoteStateResolver::new(self.store.as_ref());
            let (built, resolved) = tokio::join!(build, resolver.resolve(canonical_key));
            let (archive, local) = join_build(built)?;
            (archive, local, resolved?)
        };

        if let Some(path) = &options.keep_archive {
            archive.write_to(path)?;
            info!(path = %path.display(), "Kept local archive");
        }

        let decision = if options.force {
            SyncDecision::Publish
        } else {
            decide(&local, remote.fingerprint.as_ref())
        };
        info!(
            local = %local.short(),
            remote = %remote.fingerprint.map(|f| f.short()).unwrap_or_else(|| "<absent>".to_string()),
            %decision,
            "Sync decision"
        );

        let mut report = SyncReport {
            decision,
            local_fingerprint: local,
            remote_fingerprint: remote.fingerprint,
            canonical_key: canonical_key.to_string(),
            versioned_key: None,
            capture_time: format_capture_time(&capture_time),
            archive_bytes: archive.len() as u64,
            entries: archive.entry_count(),
            files: archive.file_count(),
            content_bytes: archive.content_bytes(),
            writes: Vec::new(),
            dry_run: options.dry_run,
            forced: options.force,
        };

        if decision == SyncDecision::NoChange {
            info!(duration_ms = start.elapsed().as_millis() as u64, "Remote already up to date");
            return Ok(report);
        }

        report.versioned_key = Some(versioned_key(canonical_key, &capture_time));
        if options.dry_run {
            info!("Dry run: skipping publish");
            return Ok(report);
        }

        let mut publisher = VersionedPublisher::new(self.store.as_ref(), canonical_key)
            .with_order(self.settings.publish_order);
        if self.settings.check_conflicts && !options.force {
            publisher = publisher.with_conflict_check(remote.fingerprint);
        }
        let outcome = publisher.publish(&archive, &local, &capture_time).await?;

        report.writes = match self.settings.publish_order {
            PublishOrder::HistoryFirst => vec![outcome.versioned_key, outcome.canonical_key],
            PublishOrder::Concurrent => vec![outcome.canonical_key, outcome.versioned_key],
        };
        info!(
            writes = report.writes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Published snapshot"
        );
        Ok(report)
    }

    fn spawn_build(
        &self,
    ) -> tokio::task::JoinHandle<Result<(Archive, Fingerprint), crate::error::ArchiveError>> {
        let builder = ArchiveBuilder::new(self.settings.source_root.clone())
            .with_walker_config(self.settings.walker.clone())
            .with_compression(self.settings.compression);
        tokio::task::spawn_blocking(move || {
            let archive = builder.build()?;
            let local = fingerprint::compute(&archive)?;
            Ok((archive, local))
        })
    }
}

fn join_build(
    joined: Result<Result<(Archive, Fingerprint), crate::error::ArchiveError>, tokio::task::JoinError>,
) -> Result<(Archive, Fingerprint), SyncError> {
    let built = joined.map_err(|e| SyncError::Runtime(format!("Archive build task failed: {}", e)))?;
    Ok(built?)
}

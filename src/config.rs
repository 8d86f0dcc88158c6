//! Configuration System
//!
//! Layered configuration for a sync run: defaults, the global config file, the
//! workspace config file, then `SNAPSYNC_*` environment variables. The result
//! is validated and turned into [`SyncSettings`] for the engine; nothing is
//! read from global state after that.

use crate::archive::{Compression, WalkerConfig};
use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::remote::{BlobStore, HttpBlobStore, LocalBlobStore};
use crate::sync::{PublishOrder, SyncSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapsyncConfig {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The directory tree to snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source root directory (required)
    pub root: Option<PathBuf>,

    #[serde(flatten)]
    pub walker: WalkerConfig,
}

/// Blob store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A directory on this machine acting as the bucket store
    #[default]
    Local,
    /// S3-style HTTP endpoint
    Http,
}

/// Where snapshots are published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Key of the object that always holds the latest snapshot
    #[serde(default = "default_canonical_key")]
    pub canonical_key: String,

    /// HTTP endpoint (http backend); defaults to the regional S3 host
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Storage directory (local backend); defaults to the user data directory
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Bearer token (http backend)
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bucket() -> String {
    "snapshots".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_canonical_key() -> String {
    "current-snapshot.tar.gz".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            bucket: default_bucket(),
            region: default_region(),
            canonical_key: default_canonical_key(),
            endpoint: None,
            root: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Container compression setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    None,
    #[default]
    Gzip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub compression: CompressionKind,

    /// Gzip level 0-9
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    6
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression: CompressionKind::default(),
            level: default_level(),
        }
    }
}

impl ArchiveConfig {
    pub fn to_compression(&self) -> Compression {
        match self.compression {
            CompressionKind::None => Compression::None,
            CompressionKind::Gzip => Compression::Gzip { level: self.level },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub order: PublishOrder,

    /// Re-read canonical before overwriting it and fail on a concurrent change
    #[serde(default = "default_true")]
    pub check_conflicts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            order: PublishOrder::default(),
            check_conflicts: true,
        }
    }
}

impl SnapsyncConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match &self.source.root {
            None => errors.push("source.root is not set".to_string()),
            Some(root) if root.as_os_str().is_empty() => {
                errors.push("source.root cannot be empty".to_string())
            }
            Some(_) => {}
        }

        let key = self.remote.canonical_key.as_str();
        if key.is_empty() {
            errors.push("remote.canonical_key cannot be empty".to_string());
        } else if key.ends_with('/') || key.starts_with('/') {
            errors.push(format!("remote.canonical_key '{}' must name an object", key));
        }
        if self.remote.bucket.is_empty() {
            errors.push("remote.bucket cannot be empty".to_string());
        }
        if self.remote.backend == BackendKind::Http {
            match &self.remote.endpoint {
                None if self.remote.region.is_empty() => errors.push(
                    "remote.region cannot be empty when remote.endpoint is not set".to_string(),
                ),
                Some(endpoint)
                    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") =>
                {
                    errors.push(format!("remote.endpoint '{}' is not an http(s) URL", endpoint))
                }
                _ => {}
            }
        }

        if self.archive.level > 9 {
            errors.push(format!(
                "archive.level must be between 0 and 9, got {}",
                self.archive.level
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and produce the engine settings
    pub fn sync_settings(&self) -> Result<SyncSettings, SyncError> {
        self.validate().map_err(validation_error)?;
        let source_root = self.source.root.clone().unwrap_or_default();
        Ok(SyncSettings {
            source_root,
            canonical_key: self.remote.canonical_key.clone(),
            walker: self.source.walker.clone(),
            compression: self.archive.to_compression(),
            publish_order: self.publish.order,
            check_conflicts: self.publish.check_conflicts,
        })
    }

    /// Construct the configured blob store
    pub fn blob_store(&self) -> Result<Arc<dyn BlobStore>, SyncError> {
        match self.remote.backend {
            BackendKind::Local => {
                let root = match &self.remote.root {
                    Some(root) => root.clone(),
                    None => default_local_root()?,
                };
                Ok(Arc::new(LocalBlobStore::new(root, &self.remote.bucket)))
            }
            BackendKind::Http => {
                let store = HttpBlobStore::new(
                    self.remote.endpoint.as_deref(),
                    &self.remote.bucket,
                    &self.remote.region,
                    self.remote.token.clone(),
                    Duration::from_secs(self.remote.timeout_secs),
                )?;
                Ok(Arc::new(store))
            }
        }
    }
}

fn validation_error(errors: Vec<String>) -> SyncError {
    SyncError::Config(format!(
        "Configuration validation failed:\n{}",
        errors.join("\n")
    ))
}

/// `<user data dir>/buckets`, where the local backend keeps its buckets
pub fn default_local_root() -> Result<PathBuf, SyncError> {
    directories::ProjectDirs::from("", "", "snapsync")
        .map(|dirs| dirs.data_dir().join("buckets"))
        .ok_or_else(|| SyncError::Config("Could not determine a user data directory".to_string()))
}

/// Loads [`SnapsyncConfig`] from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with the global file and `workspace_root/snapsync.toml`
    pub fn load(workspace_root: &Path) -> Result<SnapsyncConfig, SyncError> {
        Self::load_layers(global_config_path().as_deref(), workspace_root)
    }

    /// Load with an explicit global file path (or none)
    pub fn load_layers(
        global: Option<&Path>,
        workspace_root: &Path,
    ) -> Result<SnapsyncConfig, SyncError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder, global)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder
            .add_source(merge::merge_policy::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load from a single file; replaces the global and workspace files
    pub fn load_from_file(path: &Path) -> Result<SnapsyncConfig, SyncError> {
        if !path.exists() {
            return Err(SyncError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path))
            .add_source(merge::merge_policy::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

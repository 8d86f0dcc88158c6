//! CLI route: single route table and run context. Dispatches to the sync engine and presentation.

use crate::archive::Archive;
use crate::clock::SystemClock;
use crate::config::{ConfigLoader, SnapsyncConfig};
use crate::error::SyncError;
use crate::fingerprint;
use crate::sync::{SyncEngine, SyncOptions, SyncReport};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_config_toml, format_fingerprint_json, format_fingerprint_text, format_report_json,
    format_status_text, format_sync_text, FingerprintOutput,
};

/// Runtime context for CLI execution: workspace and the merged configuration.
pub struct RunContext {
    config: SnapsyncConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Load configuration for `workspace_root` (or from `config_path` alone) and
    /// apply the `--source` override. A relative `source.root` from a config file
    /// is taken relative to the workspace.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        source_override: Option<PathBuf>,
    ) -> Result<Self, SyncError> {
        let mut config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        if let Some(root) = config.source.root.take() {
            config.source.root = Some(if root.is_relative() {
                workspace_root.join(root)
            } else {
                root
            });
        }
        if let Some(source) = source_override {
            config.source.root = Some(source);
        }

        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(Self {
            config,
            workspace_root,
        })
    }

    /// Build a context around an already-loaded configuration.
    pub fn from_config(workspace_root: PathBuf, config: SnapsyncConfig) -> Self {
        Self {
            config,
            workspace_root,
        }
    }

    pub fn config(&self) -> &SnapsyncConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a command and return its rendered output.
    pub fn execute(&self, command: &Commands) -> Result<String, SyncError> {
        match command {
            Commands::Sync {
                dry_run,
                force,
                keep_archive,
                format,
            } => {
                let options = SyncOptions {
                    dry_run: *dry_run,
                    force: *force,
                    keep_archive: keep_archive.clone(),
                };
                let report = self.run_engine(&options)?;
                match format.as_str() {
                    "json" => format_report_json(&report),
                    _ => Ok(format_sync_text(&report)),
                }
            }
            Commands::Status { format } => {
                let options = SyncOptions {
                    dry_run: true,
                    ..SyncOptions::default()
                };
                let report = self.run_engine(&options)?;
                match format.as_str() {
                    "json" => format_report_json(&report),
                    _ => Ok(format_status_text(&report)),
                }
            }
            Commands::Fingerprint { path, format } => {
                let output = self.fingerprint_path(path)?;
                match format.as_str() {
                    "json" => format_fingerprint_json(&output),
                    _ => Ok(format_fingerprint_text(&output)),
                }
            }
            Commands::Config { validate } => {
                if *validate {
                    match self.config.validate() {
                        Ok(()) => Ok("Configuration is valid".to_string()),
                        Err(errors) => Err(SyncError::Config(format!(
                            "{} problem(s):\n  - {}",
                            errors.len(),
                            errors.join("\n  - ")
                        ))),
                    }
                } else {
                    format_config_toml(&self.config)
                }
            }
        }
    }

    fn run_engine(&self, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        let settings = self.config.sync_settings()?;
        let store = self.config.blob_store()?;
        info!(store = %store.describe(), canonical = %settings.canonical_key, "Starting sync run");
        let engine = SyncEngine::new(settings, store, Arc::new(SystemClock));
        block_on(engine.run(options))?
    }

    fn fingerprint_path(&self, path: &Path) -> Result<FingerprintOutput, SyncError> {
        let (kind, fingerprint) = if path.is_dir() {
            let fp = fingerprint::of_directory(path, self.config.source.walker.clone())?;
            ("directory", fp)
        } else {
            let archive = Archive::read_from(path)?;
            ("archive", fingerprint::compute(&archive)?)
        };
        Ok(FingerprintOutput {
            path: path.display().to_string(),
            kind,
            fingerprint,
        })
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, SyncError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| SyncError::Runtime(format!("Failed to start async runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

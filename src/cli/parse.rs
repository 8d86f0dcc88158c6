//! CLI parse: clap types for snapsync. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// snapsync - publish a directory as a versioned snapshot archive
#[derive(Parser)]
#[command(name = "snapsync")]
#[command(about = "Snapshot a directory into a deterministic archive and publish it when it changed")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory (where snapsync.toml is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces global and workspace config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Source directory to snapshot (overrides source.root)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable all logging
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the snapshot and publish it if the remote copy differs
    Sync {
        /// Decide, but do not write anything
        #[arg(long)]
        dry_run: bool,
        /// Publish without comparing against the remote copy
        #[arg(long)]
        force: bool,
        /// Also write the built archive to this path
        #[arg(long)]
        keep_archive: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Compare the local snapshot against the remote copy without writing
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the fingerprint of a directory or an archive file
    Fingerprint {
        /// Directory or .tar / .tar.gz file
        path: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the effective configuration
    Config {
        /// Only check the configuration for problems
        #[arg(long)]
        validate: bool,
    },
}

//! Merge rules: defaults, override order, environment overrides.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("remote.backend", "local")?
        .set_default("remote.bucket", "snapshots")?
        .set_default("remote.region", "us-east-1")?
        .set_default("remote.canonical_key", "current-snapshot.tar.gz")?
        .set_default("remote.timeout_secs", 300)?
        .set_default("archive.compression", "gzip")?
        .set_default("archive.level", 6)?
        .set_default("publish.order", "history-first")?
        .set_default("publish.check_conflicts", true)
}

/// Environment source applied last: `SNAPSYNC_<SECTION>__<KEY>`.
pub fn environment() -> Environment {
    Environment::with_prefix("SNAPSYNC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

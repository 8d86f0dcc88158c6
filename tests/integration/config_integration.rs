//! Integration tests for configuration loading and the CLI route table

use snapsync::cli::{Commands, RunContext};
use snapsync::config::{BackendKind, ConfigLoader, SnapsyncConfig};
use std::fs;
use tempfile::TempDir;

fn write_workspace(temp: &TempDir) {
    let saves = temp.path().join("saves");
    fs::create_dir_all(&saves).unwrap();
    fs::write(saves.join("slot1.sav"), "chapter 2").unwrap();
    fs::write(
        temp.path().join("snapsync.toml"),
        format!(
            r#"
[source]
root = "saves"

[remote]
backend = "local"
root = "{}"
bucket = "game-saves"
canonical_key = "current-save.tar.gz"
"#,
            temp.path().join("store").display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();
}

#[test]
fn test_workspace_config_drives_sync() {
    let temp = TempDir::new().unwrap();
    write_workspace(&temp);

    let ctx = RunContext::new(temp.path().to_path_buf(), None, None).unwrap();
    assert_eq!(ctx.config().remote.backend, BackendKind::Local);

    let out = ctx
        .execute(&Commands::Sync {
            dry_run: false,
            force: false,
            keep_archive: None,
            format: "json".to_string(),
        })
        .unwrap();
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["decision"], "publish");
    assert!(temp
        .path()
        .join("store")
        .join("game-saves")
        .join("current-save.tar.gz")
        .exists());

    let out = ctx
        .execute(&Commands::Status {
            format: "json".to_string(),
        })
        .unwrap();
    let status: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(status["decision"], "no_change");
}

#[test]
fn test_source_override_wins() {
    let temp = TempDir::new().unwrap();
    write_workspace(&temp);
    let other = temp.path().join("other");
    fs::create_dir(&other).unwrap();

    let ctx = RunContext::new(temp.path().to_path_buf(), None, Some(other.clone())).unwrap();
    assert_eq!(ctx.config().source.root, Some(other));
}

#[test]
fn test_explicit_config_file_replaces_workspace_file() {
    let temp = TempDir::new().unwrap();
    write_workspace(&temp);
    let explicit = temp.path().join("alt.toml");
    fs::write(&explicit, "[remote]\nbucket = \"alt\"\n").unwrap();

    let ctx = RunContext::new(temp.path().to_path_buf(), Some(explicit), None).unwrap();
    assert_eq!(ctx.config().remote.bucket, "alt");
    assert!(ctx.config().source.root.is_none());
}

#[test]
fn test_environment_overrides_files() {
    let temp = TempDir::new().unwrap();
    write_workspace(&temp);

    std::env::set_var("SNAPSYNC_REMOTE__REGION", "eu-central-1");
    let config = ConfigLoader::load_layers(None, temp.path());
    std::env::remove_var("SNAPSYNC_REMOTE__REGION");

    assert_eq!(config.unwrap().remote.region, "eu-central-1");
}

#[test]
fn test_config_command_renders_toml() {
    let temp = TempDir::new().unwrap();
    write_workspace(&temp);

    let ctx = RunContext::new(temp.path().to_path_buf(), None, None).unwrap();
    let rendered = ctx.execute(&Commands::Config { validate: false }).unwrap();
    let parsed: SnapsyncConfig = toml::from_str(&rendered).unwrap();

    assert_eq!(parsed.remote.bucket, "game-saves");
    assert_eq!(parsed.source.root, ctx.config().source.root);
    assert_eq!(
        ctx.execute(&Commands::Config { validate: true }).unwrap(),
        "Configuration is valid"
    );
}

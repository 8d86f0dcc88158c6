//! CLI presentation: text (comfy-table + styled headings) and JSON formatters.

use crate::config::SnapsyncConfig;
use crate::error::SyncError;
use crate::fingerprint::Fingerprint;
use crate::sync::{SyncDecision, SyncReport};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Section heading for text output (bold + underline).
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_decision(decision: SyncDecision) -> String {
    match decision {
        SyncDecision::NoChange => format!("{}", decision.green()),
        SyncDecision::Publish => format!("{}", decision.yellow()),
    }
}

fn fingerprint_cell(fingerprint: Option<&Fingerprint>) -> String {
    fingerprint
        .map(|f| f.to_hex())
        .unwrap_or_else(|| "(absent)".to_string())
}

fn summary_table(report: &SyncReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Canonical".to_string(), report.canonical_key.clone()]);
    table.add_row(vec![
        "Local".to_string(),
        report.local_fingerprint.to_hex(),
    ]);
    table.add_row(vec![
        "Remote".to_string(),
        if report.forced {
            "(not checked)".to_string()
        } else {
            fingerprint_cell(report.remote_fingerprint.as_ref())
        },
    ]);
    table.add_row(vec![
        "Archive".to_string(),
        format!(
            "{} bytes, {} entries ({} files, {} content bytes)",
            report.archive_bytes, report.entries, report.files, report.content_bytes
        ),
    ]);
    table
}

/// Human-readable result of `sync`.
pub fn format_sync_text(report: &SyncReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Sync")));
    out.push_str(&format!("{}\n\n", summary_table(report)));
    out.push_str(&format!("  Decision: {}\n", format_decision(report.decision)));

    match report.decision {
        SyncDecision::NoChange => out.push_str("  Remote snapshot is up to date.\n"),
        SyncDecision::Publish if report.dry_run => {
            if let Some(ref key) = report.versioned_key {
                out.push_str(&format!(
                    "  Dry run: would write '{}' and '{}'.\n",
                    key, report.canonical_key
                ));
            }
        }
        SyncDecision::Publish => {
            out.push_str(&format!("  Captured at {} UTC\n", report.capture_time));
            for key in &report.writes {
                out.push_str(&format!("  Wrote {}\n", key));
            }
        }
    }
    out
}

/// Human-readable result of `status`.
pub fn format_status_text(report: &SyncReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Snapshot Status")));
    out.push_str(&format!("{}\n\n", summary_table(report)));
    let verdict = match report.decision {
        SyncDecision::NoChange => "in sync",
        SyncDecision::Publish if report.remote_fingerprint.is_none() => "never published",
        SyncDecision::Publish => "out of date",
    };
    out.push_str(&format!(
        "  Remote is {} ({})\n",
        verdict,
        format_decision(report.decision)
    ));
    out
}

/// Serialize a report for `--format json`.
pub fn format_report_json(report: &SyncReport) -> Result<String, SyncError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| SyncError::Runtime(format!("Failed to serialize report: {}", e)))
}

/// Fingerprint of a directory or archive file.
#[derive(Debug, Clone, Serialize)]
pub struct FingerprintOutput {
    pub path: String,
    /// "directory" or "archive"
    pub kind: &'static str,
    pub fingerprint: Fingerprint,
}

pub fn format_fingerprint_text(output: &FingerprintOutput) -> String {
    format!("{}  {}", output.fingerprint, output.path)
}

pub fn format_fingerprint_json(output: &FingerprintOutput) -> Result<String, SyncError> {
    serde_json::to_string_pretty(output)
        .map_err(|e| SyncError::Runtime(format!("Failed to serialize fingerprint: {}", e)))
}

/// Effective configuration as TOML, with the remote token redacted.
pub fn format_config_toml(config: &SnapsyncConfig) -> Result<String, SyncError> {
    let mut shown = config.clone();
    if shown.remote.token.is_some() {
        shown.remote.token = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| SyncError::Config(format!("Failed to render configuration: {}", e)))
}

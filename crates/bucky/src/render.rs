//! Result rendering for stdout.

use std::fmt::Write;

use anyhow::Result;
use bucky_cluster::{InconsistencyReport, SyncReport};

use crate::cli::OutputFormat;

/// Renders an inconsistency report.
///
/// JSON is a single object of node address to sorted metric names. Text is one
/// `address: metric` line per misplaced metric.
pub fn render_report(report: &InconsistencyReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for (node, metric) in report.entries() {
                writeln!(out, "{node}: {metric}")?;
            }
            Ok(out)
        }
    }
}

/// One-line summary of a sync run.
pub fn summarize_sync(report: &SyncReport) -> String {
    format!(
        "{} jobs: {} copied, {} dry run, {} missing, {} no-op, {} failed, {} cancelled ({} bytes)",
        report.total,
        report.copied,
        report.dry_run,
        report.skipped_missing,
        report.skipped_noop,
        report.failed,
        report.cancelled,
        report.bytes_copied,
    )
}

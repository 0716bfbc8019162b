//! Presentation: text tables and json for scenario reports.

use crate::demo::{CancelReport, TimeoutReport, ValuesReport, WorkerReport};
use crate::error::CtxTreeError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;

fn to_json<T: Serialize>(report: &T) -> Result<String, CtxTreeError> {
    serde_json::to_string_pretty(report).map_err(|e| CtxTreeError::Io(e.into()))
}

fn format_err(err: &Option<String>) -> String {
    err.clone().unwrap_or_else(|| "-".to_string())
}

fn workers_table(workers: &[WorkerReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Worker", "Ticks", "Stopped after (ms)"]);
    for row in workers {
        table.add_row(vec![
            row.worker.to_string(),
            row.ticks.to_string(),
            row.stopped_after_ms.to_string(),
        ]);
    }
    table
}

pub fn format_cancel_report(report: &CancelReport, format: &str) -> Result<String, CtxTreeError> {
    if format == "json" {
        return to_json(report);
    }
    Ok(format!(
        "Cancel scenario (started {})\n  Cancelled parent after: {} ms\n  Parent error: {}\n  Child error: {}\n\n{}",
        report.started_at,
        report.cancel_after_ms,
        format_err(&report.parent_err),
        format_err(&report.child_err),
        workers_table(&report.workers)
    ))
}

pub fn format_timeout_report(report: &TimeoutReport, format: &str) -> Result<String, CtxTreeError> {
    if format == "json" {
        return to_json(report);
    }
    Ok(format!(
        "Timeout scenario (started {})\n  Timeout: {} ms\n  Manual cancel after: {} ms\n  Error: {}\n\n{}",
        report.started_at,
        report.timeout_ms,
        report.cancel_after_ms,
        format_err(&report.err),
        workers_table(&report.workers)
    ))
}

pub fn format_values_report(report: &ValuesReport, format: &str) -> Result<String, CtxTreeError> {
    if format == "json" {
        return to_json(report);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Context", "Key", "Value"]);
    for row in &report.lookups {
        table.add_row(vec![
            row.context.clone(),
            row.key.clone(),
            row.value.clone().unwrap_or_else(|| "<absent>".to_string()),
        ]);
    }
    Ok(format!("Value lookups\n\n{}", table))
}

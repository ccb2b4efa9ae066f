//! Text summary builder for CLI output.
//!
//! Formats execution records and a followed run as human-readable lines for text mode.

use crate::model::{display_status, ExecutionRecord};
use crate::orchestrator::Dashboard;
use crate::timestamp::format_timestamp;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn artifacts_label(record: &ExecutionRecord) -> String {
    let mut parts = Vec::new();
    if record.primary_artifact().is_some() {
        parts.push("PDF");
    }
    if record.log_file().is_some() {
        parts.push("Log");
    }
    if parts.is_empty() {
        "-".into()
    } else {
        parts.join("+")
    }
}

/// One line per record, most recent first (callers pass records already sorted).
pub(crate) fn build_records_table(records: &[&ExecutionRecord]) -> TextSummary {
    let mut lines = Vec::with_capacity(records.len() + 1);
    if records.is_empty() {
        lines.push("No executions found.".into());
        return TextSummary { lines };
    }

    lines.push(format!(
        "{:<8} {:<20} {:<12} {:<20} {}",
        "#", "Executed By", "Status", "Last Modified At", "Artifacts"
    ));
    for r in records {
        lines.push(format!(
            "{:<8} {:<20} {:<12} {:<20} {}",
            r.id.as_deref().unwrap_or("-"),
            r.executed_by.as_deref().unwrap_or("-"),
            display_status(r.status.as_deref()),
            r.recency_field().map(format_timestamp).unwrap_or_else(|| "-".into()),
            artifacts_label(r),
        ));
    }
    TextSummary { lines }
}

/// Describe the run in focus: identity, status, results and log.
pub(crate) fn build_run_summary(state: &Dashboard) -> TextSummary {
    let mut lines = Vec::new();
    lines.push(format!(
        "Run: #{}",
        state.current_run_id.as_deref().unwrap_or("-")
    ));
    lines.push(format!("Status: {}", state.current_status));

    let Some(record) = state.current_record.as_ref() else {
        lines.push("No matching execution record yet.".into());
        return TextSummary { lines };
    };

    if let Some(by) = record.executed_by.as_deref() {
        lines.push(format!("Executed by: {by}"));
    }
    if let Some(script) = record.script_name.as_deref() {
        lines.push(format!("Script: {script}"));
    }
    if let Some(ts) = record.timestamp.as_deref() {
        lines.push(format!("Started: {}", format_timestamp(ts)));
    }

    let results = record.results();
    if results.is_empty() {
        lines.push("Results: none".into());
    } else {
        lines.push("Results:".into());
        for item in results {
            let key = item.file_path.as_deref().unwrap_or("-");
            lines.push(format!("  {} ({}) {}", item.title(), item.detail(), key));
        }
    }
    match record.log_file() {
        Some(log) => lines.push(format!("Log: {log}")),
        None => lines.push("Log: not available".into()),
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResultItem, RunForm};
    use crate::test_support::record;

    #[test]
    fn empty_listing_says_so() {
        let summary = build_records_table(&[]);
        assert_eq!(summary.lines, vec!["No executions found.".to_string()]);
    }

    #[test]
    fn table_lists_artifacts() {
        let mut r = record("7", "Ops", "AgentsValidation", "Pass", "2025-03-01T10:00:00Z");
        r.script_result = Some(vec![ResultItem {
            sub_script: Some("Report".into()),
            description: None,
            file_path: Some("a/b/report.pdf".into()),
        }]);
        r.log_file_path = Some("a/b/log.txt".into());
        let summary = build_records_table(&[&r]);
        assert_eq!(summary.lines.len(), 2);
        assert!(summary.lines[1].starts_with("7 "));
        assert!(summary.lines[1].ends_with("PDF+Log"));
    }

    #[test]
    fn run_summary_without_record() {
        let mut d = Dashboard::new(RunForm::default());
        d.current_run_id = Some("12".into());
        let summary = build_run_summary(&d);
        assert_eq!(summary.lines[0], "Run: #12");
        assert_eq!(summary.lines[1], "Status: Running");
        assert_eq!(summary.lines[2], "No matching execution record yet.");
    }
}

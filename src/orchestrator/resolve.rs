//! Selection of "the run in focus" out of a listed batch of executions.

use crate::model::ExecutionRecord;
use crate::timestamp::recency_millis;

/// What the caller knows about the run it is looking for.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveTarget<'a> {
    pub run_id: Option<&'a str>,
    pub run_timestamp: Option<&'a str>,
    pub executed_by: &'a str,
    pub script_name: &'a str,
}

fn recency(r: &ExecutionRecord) -> i128 {
    recency_millis(r.recency_field())
}

fn same_text(a: Option<&str>, b: &str) -> bool {
    a.unwrap_or("").to_lowercase() == b.to_lowercase()
}

/// Records ordered most recent first. Ties keep their listed order.
pub fn sorted_by_recency(records: &[ExecutionRecord]) -> Vec<&ExecutionRecord> {
    let mut out: Vec<&ExecutionRecord> = records.iter().collect();
    out.sort_by_key(|r| std::cmp::Reverse(recency(r)));
    out
}

/// Pick the record matching the target run.
///
/// Tries an exact id match, then an exact timestamp match, then the most recent
/// record whose executor and script name match case-insensitively.
pub fn pick_current_record<'a>(
    records: &'a [ExecutionRecord],
    target: &ResolveTarget<'_>,
) -> Option<&'a ExecutionRecord> {
    if let Some(id) = target.run_id.filter(|s| !s.is_empty()) {
        if let Some(found) = records.iter().find(|r| r.id.as_deref() == Some(id)) {
            tracing::debug!(id, "resolved current record by id");
            return Some(found);
        }
    }

    if let Some(ts) = target.run_timestamp.filter(|s| !s.is_empty()) {
        if let Some(found) = records.iter().find(|r| r.timestamp.as_deref() == Some(ts)) {
            tracing::debug!(timestamp = ts, "resolved current record by timestamp");
            return Some(found);
        }
    }

    let mut mine: Vec<&ExecutionRecord> = records
        .iter()
        .filter(|r| {
            same_text(r.executed_by.as_deref(), target.executed_by)
                && same_text(r.script_name.as_deref(), target.script_name)
        })
        .collect();
    mine.sort_by_key(|r| std::cmp::Reverse(recency(r)));
    mine.into_iter().next()
}

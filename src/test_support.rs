//! Shared fixtures for unit tests.

use crate::model::{DashboardConfig, ExecutionRecord, RunForm};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) fn test_config(base_url: &str) -> DashboardConfig {
    DashboardConfig {
        base_url: base_url.to_string(),
        user_agent: "exec-dashboard-test".into(),
        poll_interval: Duration::from_millis(20),
        max_polls: 5,
        download_dir: PathBuf::from("."),
        open_with: None,
        load_on_launch: false,
        form: RunForm {
            executed_by: "Ops".into(),
            script_name: "AgentsValidation".into(),
            user_id: "u-1".into(),
        },
    }
}

pub(crate) fn record(id: &str, executed_by: &str, script: &str, status: &str, ts: &str) -> ExecutionRecord {
    ExecutionRecord {
        id: Some(id.into()),
        executed_by: Some(executed_by.into()),
        script_name: Some(script.into()),
        status: Some(status.into()),
        timestamp: Some(ts.into()),
        ..Default::default()
    }
}

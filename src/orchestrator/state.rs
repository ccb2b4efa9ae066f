//! Controller-owned dashboard state and its transitions.
//!
//! Everything here is synchronous; the async controller loop decides when each
//! transition happens and publishes the result to presentation layers.

use super::resolve::{pick_current_record, ResolveTarget};
use crate::api::ApiError;
use crate::model::{display_status, ExecutionRecord, FormField, RunForm, RunHandle, StatusClass};

/// A blocking message for the operator, shown until dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// What a completed list refresh means for polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub matched: bool,
    pub terminal: bool,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub form: RunForm,

    pub current_run_id: Option<String>,
    pub current_run_timestamp: Option<String>,
    // Snapshotted at run start so later form edits do not change matching.
    pub current_run_executed_by: Option<String>,
    pub current_run_script_name: Option<String>,

    pub current_record: Option<ExecutionRecord>,
    pub current_status: String,
    pub records: Vec<ExecutionRecord>,

    pub is_running: bool,
    pub is_auto_refreshing: bool,
    refreshes_in_flight: usize,
    pub polls_done: u32,
    pub runs_started: u32,

    pub notice: Option<Notice>,
    pub info: String,
    pub last_download_url: Option<String>,
}

impl Dashboard {
    pub fn new(form: RunForm) -> Self {
        Self {
            form,
            current_run_id: None,
            current_run_timestamp: None,
            current_run_executed_by: None,
            current_run_script_name: None,
            current_record: None,
            current_status: "Running".into(),
            records: Vec::new(),
            is_running: false,
            is_auto_refreshing: false,
            refreshes_in_flight: 0,
            polls_done: 0,
            runs_started: 0,
            notice: None,
            info: String::new(),
            last_download_url: None,
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshes_in_flight > 0
    }

    pub fn set_field(&mut self, field: FormField, value: String) {
        self.form.set(field, value);
    }

    /// Restore the launch executor and script name and empty the user id.
    pub fn clear_form(&mut self, defaults: &RunForm) {
        self.form = RunForm {
            executed_by: defaults.executed_by.clone(),
            script_name: defaults.script_name.clone(),
            user_id: String::new(),
        };
    }

    /// Mark a run as starting and return the form values it is started with.
    pub fn begin_run(&mut self) -> RunForm {
        // The previous run's identity must not be matched while the new one starts.
        self.current_run_id = None;
        self.current_run_timestamp = None;
        self.current_run_executed_by = Some(self.form.executed_by.clone());
        self.current_run_script_name = Some(self.form.script_name.clone());
        self.current_status = display_status(None).to_string();
        self.current_record = None;
        self.is_running = true;
        self.runs_started += 1;
        self.info = format!("Starting {}…", self.form.script_name);
        self.form.clone()
    }

    pub fn apply_run_started(&mut self, submitted: &RunForm, handle: RunHandle) {
        self.is_running = true;
        self.current_run_id = handle.id;
        self.current_run_timestamp = handle.timestamp;
        self.current_status = display_status(handle.status.as_deref()).to_string();
        self.current_record = handle.record;
        self.current_run_executed_by = Some(submitted.executed_by.clone());
        self.current_run_script_name = Some(submitted.script_name.clone());
        self.info = match self.current_run_id.as_deref() {
            Some(id) => format!("Run #{id} started"),
            None => "Run started".into(),
        };
    }

    pub fn apply_run_failed(&mut self, err: &ApiError) {
        self.is_running = false;
        self.info = format!("Run failed: {err}");
        self.notice = Some(Notice::new(
            "Run failed",
            format!("Failed to start the script: {err}"),
        ));
    }

    /// Register a list call and return the script-name filter it should use.
    pub fn begin_refresh(&mut self) -> String {
        self.refreshes_in_flight += 1;
        self.form.script_name.clone()
    }

    pub fn refresh_failed(&mut self, err: &ApiError) {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        self.info = format!("Refresh failed: {err}");
    }

    pub fn resolve_target(&self) -> ResolveTarget<'_> {
        ResolveTarget {
            run_id: self.current_run_id.as_deref(),
            run_timestamp: self.current_run_timestamp.as_deref(),
            executed_by: self
                .current_run_executed_by
                .as_deref()
                .unwrap_or(&self.form.executed_by),
            script_name: self
                .current_run_script_name
                .as_deref()
                .unwrap_or(&self.form.script_name),
        }
    }

    /// Replace the listed records and re-resolve the run in focus.
    ///
    /// When nothing matches, the previous selection is kept.
    pub fn apply_records(&mut self, records: Vec<ExecutionRecord>) -> RefreshOutcome {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        self.records = records;

        let found = pick_current_record(&self.records, &self.resolve_target()).cloned();
        let Some(found) = found else {
            return RefreshOutcome {
                matched: false,
                terminal: false,
            };
        };

        let class = StatusClass::of(found.status.as_deref());
        self.current_status = display_status(found.status.as_deref()).to_string();
        self.current_record = Some(found);
        RefreshOutcome {
            matched: true,
            terminal: class.is_terminal(),
        }
    }
}

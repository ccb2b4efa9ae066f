use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings shared by the controller and the presentation layers.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub base_url: String,
    pub user_agent: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
    pub download_dir: PathBuf,
    pub open_with: Option<String>,
    pub load_on_launch: bool,
    pub form: RunForm,
}

/// Operator-editable inputs for starting a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunForm {
    pub executed_by: String,
    pub script_name: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    ExecutedBy,
    ScriptName,
    UserId,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::ExecutedBy, FormField::ScriptName, FormField::UserId];

    pub fn label(self) -> &'static str {
        match self {
            FormField::ExecutedBy => "Executed By",
            FormField::ScriptName => "Script Name",
            FormField::UserId => "User ID",
        }
    }
}

impl RunForm {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::ExecutedBy => &self.executed_by,
            FormField::ScriptName => &self.script_name,
            FormField::UserId => &self.user_id,
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        match field {
            FormField::ExecutedBy => self.executed_by = value,
            FormField::ScriptName => self.script_name = value,
            FormField::UserId => self.user_id = value,
        }
    }
}

/// One artifact produced by a sub-script of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(default, alias = "subScript")]
    pub sub_script: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "filePath")]
    pub file_path: Option<String>,
}

impl ResultItem {
    pub fn title(&self) -> &str {
        non_empty(self.sub_script.as_deref()).unwrap_or("Result")
    }

    pub fn detail(&self) -> &str {
        non_empty(self.description.as_deref())
            .or(non_empty(self.file_path.as_deref()))
            .unwrap_or("")
    }
}

/// A persisted view of one run, as returned by the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default, alias = "executedBy")]
    pub executed_by: Option<String>,
    #[serde(default, alias = "scriptName")]
    pub script_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
    #[serde(default, alias = "modifiedAt")]
    pub modified_at: Option<String>,
    #[serde(default, alias = "scriptResult", deserialize_with = "de_lenient_vec")]
    pub script_result: Option<Vec<ResultItem>>,
    #[serde(default, alias = "logFilePath")]
    pub log_file_path: Option<String>,
}

impl ExecutionRecord {
    pub fn results(&self) -> &[ResultItem] {
        self.script_result.as_deref().unwrap_or(&[])
    }

    /// File key of the first result artifact, usually the PDF report.
    pub fn primary_artifact(&self) -> Option<&str> {
        self.results()
            .first()
            .and_then(|it| non_empty(it.file_path.as_deref()))
    }

    pub fn log_file(&self) -> Option<&str> {
        non_empty(self.log_file_path.as_deref())
    }

    /// The best available date-like field: `modified_at`, then `created_at`, then `timestamp`.
    pub fn recency_field(&self) -> Option<&str> {
        non_empty(self.modified_at.as_deref())
            .or(non_empty(self.created_at.as_deref()))
            .or(non_empty(self.timestamp.as_deref()))
    }
}

/// Identity of a freshly started run, taken from the run endpoint's response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub status: Option<String>,
    pub executed_by: Option<String>,
    pub script_name: Option<String>,
    /// The server's echo of the new record, when it sent one.
    pub record: Option<ExecutionRecord>,
}

/// Display class of a status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    Success,
    Running,
    Failure,
    Neutral,
}

impl StatusClass {
    pub fn of(status: Option<&str>) -> Self {
        let s = status.unwrap_or("").trim().to_ascii_lowercase();
        match s.as_str() {
            "pass" | "success" => StatusClass::Success,
            "running" | "in-progress" => StatusClass::Running,
            "fail" | "failed" | "error" => StatusClass::Failure,
            _ => StatusClass::Neutral,
        }
    }

    /// Only recognized success/failure keywords end a poll.
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusClass::Success | StatusClass::Failure)
    }
}

/// Status shown for a record; records without one are still considered running.
pub fn display_status(status: Option<&str>) -> &str {
    non_empty(status).unwrap_or("Running")
}

pub fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(v.and_then(|v| id_to_string(&v)))
}

/// Stringify an id that may arrive as a string or a number.
pub fn id_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_lenient_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(arr @ serde_json::Value::Array(_)) => serde_json::from_value(arr).ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_is_case_insensitive() {
        assert_eq!(StatusClass::of(Some("Pass")), StatusClass::Success);
        assert_eq!(StatusClass::of(Some("SUCCESS")), StatusClass::Success);
        assert_eq!(StatusClass::of(Some("Running")), StatusClass::Running);
        assert_eq!(StatusClass::of(Some("in-progress")), StatusClass::Running);
        assert_eq!(StatusClass::of(Some("Fail")), StatusClass::Failure);
        assert_eq!(StatusClass::of(Some("failed")), StatusClass::Failure);
        assert_eq!(StatusClass::of(Some("Error")), StatusClass::Failure);
        assert_eq!(StatusClass::of(Some("queued")), StatusClass::Neutral);
        assert_eq!(StatusClass::of(Some("")), StatusClass::Neutral);
        assert_eq!(StatusClass::of(None), StatusClass::Neutral);
    }

    #[test]
    fn unknown_statuses_are_not_terminal() {
        assert!(StatusClass::of(Some("pass")).is_terminal());
        assert!(StatusClass::of(Some("error")).is_terminal());
        assert!(!StatusClass::of(Some("running")).is_terminal());
        assert!(!StatusClass::of(Some("queued")).is_terminal());
        assert!(!StatusClass::of(None).is_terminal());
    }

    #[test]
    fn record_decodes_snake_case_wire_format() {
        let r: ExecutionRecord = serde_json::from_value(serde_json::json!({
            "id": 42,
            "executed_by": "Ops",
            "script_name": "AgentsValidation",
            "status": "Pass",
            "modified_at": "2025-09-27T11:00:00Z",
            "script_result": [{"sub_script": "agents", "file_path": "a/b/report.pdf"}],
            "log_file_path": "a/b/log.txt"
        }))
        .unwrap();
        assert_eq!(r.id.as_deref(), Some("42"));
        assert_eq!(r.primary_artifact(), Some("a/b/report.pdf"));
        assert_eq!(r.log_file(), Some("a/b/log.txt"));
        assert_eq!(r.results()[0].title(), "agents");
        assert_eq!(r.results()[0].detail(), "a/b/report.pdf");
    }

    #[test]
    fn record_accepts_camel_case_and_bad_result_lists() {
        let r: ExecutionRecord = serde_json::from_value(serde_json::json!({
            "id": "7",
            "executedBy": "Ops",
            "scriptName": "S1",
            "scriptResult": {"unexpected": true},
            "logFilePath": ""
        }))
        .unwrap();
        assert_eq!(r.executed_by.as_deref(), Some("Ops"));
        assert!(r.results().is_empty());
        assert_eq!(r.log_file(), None);
        assert_eq!(display_status(r.status.as_deref()), "Running");
    }

    #[test]
    fn recency_field_prefers_modified_then_created_then_timestamp() {
        let mut r = ExecutionRecord {
            timestamp: Some("t".into()),
            created_at: Some("c".into()),
            modified_at: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(r.recency_field(), Some("c"));
        r.created_at = None;
        assert_eq!(r.recency_field(), Some("t"));
        r.modified_at = Some("m".into());
        assert_eq!(r.recency_field(), Some("m"));
    }
}

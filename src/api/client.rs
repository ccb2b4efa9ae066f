use super::download::{build_download_request, extract_download_url};
use super::ApiError;
use crate::model::{id_to_string, DashboardConfig, ExecutionRecord, RunForm, RunHandle};
use bytes::Bytes;
use reqwest::{Client, Response, Url};
use serde_json::{json, Value};

const RUN_PATH: &str = "run-script";
const LIST_PATH: &str = "list-scripts";
const DOWNLOAD_PATH: &str = "download-url";

/// Client for the run / list / download-resolve endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    http: Client,
    run_url: Url,
    list_url: Url,
    download_url: Url,
}

fn endpoint(base: &str, path: &str) -> Result<Url, ApiError> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path);
    Url::parse(&raw).map_err(|e| ApiError::InvalidEndpoint {
        url: raw.clone(),
        detail: e.to_string(),
    })
}

fn ensure_success(endpoint: &'static str, resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::Status { endpoint, status });
    }
    Ok(resp)
}

async fn read_json(endpoint: &'static str, resp: Response) -> Result<Value, ApiError> {
    let text = ensure_success(endpoint, resp)?.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Malformed {
        endpoint,
        detail: e.to_string(),
    })
}

impl ExecutionClient {
    pub fn new(cfg: &DashboardConfig) -> Result<Self, ApiError> {
        let http = Client::builder().user_agent(cfg.user_agent.clone()).build()?;
        Ok(Self {
            http,
            run_url: endpoint(&cfg.base_url, RUN_PATH)?,
            list_url: endpoint(&cfg.base_url, LIST_PATH)?,
            download_url: endpoint(&cfg.base_url, DOWNLOAD_PATH)?,
        })
    }

    /// Start a run of `form.script_name` on behalf of `form.executed_by`.
    pub async fn run_script(&self, form: &RunForm) -> Result<RunHandle, ApiError> {
        let body = json!({
            "executedBy": form.executed_by,
            "scriptPayload": {
                "scriptName": form.script_name,
                "userId": form.user_id,
            },
        });
        let resp = self.http.post(self.run_url.clone()).json(&body).send().await?;
        let value = read_json("run", resp).await?;
        parse_run_response(&value)
    }

    /// List executions of a script. A response that is not an array yields no records.
    pub async fn list_executions(&self, script_name: &str) -> Result<Vec<ExecutionRecord>, ApiError> {
        let body = json!({ "scriptNames": [script_name] });
        let resp = self.http.post(self.list_url.clone()).json(&body).send().await?;
        let value = read_json("list", resp).await?;
        Ok(parse_list_response(value))
    }

    /// Exchange a storage key for a short-lived download URL.
    pub async fn resolve_download_url(&self, file_key: &str) -> Result<String, ApiError> {
        let url = build_download_request(&self.download_url, file_key);
        let resp = self.http.get(url).send().await?;
        let text = ensure_success("download-url", resp)?.text().await?;
        extract_download_url(&text)
    }

    /// Fetch the bytes behind a resolved download URL.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, ApiError> {
        let resp = self.http.get(url).send().await?;
        Ok(ensure_success("artifact", resp)?.bytes().await?)
    }
}

fn parse_run_response(value: &Value) -> Result<RunHandle, ApiError> {
    let Some(obj) = value.as_object() else {
        return Err(ApiError::Malformed {
            endpoint: "run",
            detail: "expected a JSON object".into(),
        });
    };

    let record = match obj.get("scriptRecord") {
        Some(v @ Value::Object(_)) => Some(
            serde_json::from_value::<ExecutionRecord>(v.clone()).map_err(|e| {
                ApiError::Malformed {
                    endpoint: "run",
                    detail: e.to_string(),
                }
            })?,
        ),
        _ => None,
    };

    let id = record
        .as_ref()
        .and_then(|r| r.id.clone())
        .or_else(|| obj.get("id").and_then(id_to_string));

    Ok(RunHandle {
        id,
        timestamp: record.as_ref().and_then(|r| r.timestamp.clone()),
        status: record.as_ref().and_then(|r| r.status.clone()),
        executed_by: record.as_ref().and_then(|r| r.executed_by.clone()),
        script_name: record.as_ref().and_then(|r| r.script_name.clone()),
        record,
    })
}

fn parse_list_response(value: Value) -> Vec<ExecutionRecord> {
    let Value::Array(items) = value else {
        tracing::debug!("list response is not an array; treating as empty");
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ExecutionRecord>(item) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable execution record");
                None
            }
        })
        .collect()
}

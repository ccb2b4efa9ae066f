//! Artifact download execution: resolve, then save or hand off to the opener.

use crate::api::download::{plan_download, DownloadPlan};
use crate::api::ExecutionClient;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// How a download request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved { path: PathBuf, url: String },
    Opened { url: String },
    /// Saving failed; the URL was handed to the opener instead.
    FallbackOpened { url: String, reason: String },
}

impl DownloadOutcome {
    pub fn url(&self) -> &str {
        match self {
            DownloadOutcome::Saved { url, .. }
            | DownloadOutcome::Opened { url }
            | DownloadOutcome::FallbackOpened { url, .. } => url,
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            DownloadOutcome::Saved { path, .. } => format!("Saved: {}", path.display()),
            DownloadOutcome::Opened { url } => format!("Opened: {url}"),
            DownloadOutcome::FallbackOpened { url, reason } => {
                format!("Save failed ({reason}); opened: {url}")
            }
        }
    }
}

/// Where downloads land and how URLs are opened.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub dir: PathBuf,
    pub open_with: Option<String>,
}

/// Resolve `file_key` and either save the artifact or open it externally.
///
/// An empty key is a no-op and yields `None`.
pub async fn download_artifact(
    client: &ExecutionClient,
    settings: &DownloadSettings,
    file_key: &str,
) -> Result<Option<DownloadOutcome>> {
    if file_key.is_empty() {
        return Ok(None);
    }
    let url = client
        .resolve_download_url(file_key)
        .await
        .context("could not get the download URL")?;

    match plan_download(file_key, &url) {
        DownloadPlan::Save { url, filename } => {
            match save_to_dir(client, &url, &settings.dir, &filename).await {
                Ok(path) => {
                    tracing::info!(key = file_key, path = %path.display(), "artifact saved");
                    Ok(Some(DownloadOutcome::Saved { path, url }))
                }
                Err(e) => {
                    let reason = format!("{e:#}");
                    tracing::warn!(key = file_key, error = %reason, "save failed; opening URL instead");
                    open_url(&url, settings.open_with.as_deref())?;
                    Ok(Some(DownloadOutcome::FallbackOpened { url, reason }))
                }
            }
        }
        DownloadPlan::Open { url } => {
            open_url(&url, settings.open_with.as_deref())?;
            tracing::info!(key = file_key, "artifact opened");
            Ok(Some(DownloadOutcome::Opened { url }))
        }
    }
}

fn safe_filename(name: &str) -> &str {
    match name {
        "" | "." | ".." => "download",
        other => other,
    }
}

async fn save_to_dir(
    client: &ExecutionClient,
    url: &str,
    dir: &Path,
    filename: &str,
) -> Result<PathBuf> {
    let bytes = client.fetch_bytes(url).await.context("fetch artifact")?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(safe_filename(filename));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Hand a URL to the platform opener, or to `open_with` when given.
pub fn open_url(url: &str, open_with: Option<&str>) -> Result<()> {
    let mut cmd = match open_with {
        Some(program) => Command::new(program),
        None if cfg!(target_os = "macos") => Command::new("open"),
        None if cfg!(windows) => {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        }
        None => Command::new("xdg-open"),
    };
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd.spawn()
        .with_context(|| format!("launch opener for {url}"))?;
    Ok(())
}

use crate::api::ExecutionClient;
use crate::model::{DashboardConfig, RunForm};
use crate::orchestrator::{self, Dashboard, DownloadSettings, UiCommand};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let mut out = std::io::LineWriter::new(std::io::stdout().lock());
        let mut err = std::io::LineWriter::new(std::io::stderr().lock());

        while let Some(line) = rx.blocking_recv() {
            let _ = match line {
                OutputLine::Stdout(msg) => writeln!(out, "{}", msg),
                OutputLine::Stderr(msg) => writeln!(err, "{}", msg),
            };
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "exec-dashboard",
    version,
    about = "Trigger remote script runs, follow their status and download their artifacts"
)]
pub struct Cli {
    /// Base URL of the execution API (endpoints: run-script, list-scripts, download-url)
    #[arg(
        long,
        env = "EXEC_DASHBOARD_BASE_URL",
        default_value = "http://localhost:3000/automation-testing"
    )]
    pub base_url: String,

    /// Operator name sent with each run
    #[arg(long, env = "EXEC_DASHBOARD_EXECUTED_BY", default_value = "")]
    pub executed_by: String,

    /// Script to run and to list executions for
    #[arg(long, env = "EXEC_DASHBOARD_SCRIPT_NAME", default_value = "AgentsValidation")]
    pub script_name: String,

    /// Target user id passed to the script
    #[arg(long, env = "EXEC_DASHBOARD_USER_ID", default_value = "")]
    pub user_id: String,

    /// Auto-refresh interval (must be greater than zero)
    #[arg(long, default_value = "3s", value_parser = parse_poll_interval)]
    pub poll_interval: humantime::Duration,

    /// Maximum number of auto-refresh polls before giving up
    #[arg(long, default_value_t = 60)]
    pub max_polls: u32,

    /// Directory for saved text artifacts (defaults to the user's download directory)
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Program used to open non-text artifacts (defaults to the platform opener)
    #[arg(long, value_name = "CMD")]
    pub open_with: Option<String>,

    /// Use --load-on-launch true or --load-on-launch false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub load_on_launch: bool,

    /// Print JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Start a run and follow it until it finishes (no TUI)
    #[arg(long, conflicts_with = "download")]
    pub run: bool,

    /// Resolve and download an artifact by storage key (no TUI)
    #[arg(long, value_name = "KEY")]
    pub download: Option<String>,

    /// Write logs to this file (TUI mode logs to the cache directory by default)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

fn parse_poll_interval(s: &str) -> Result<humantime::Duration, String> {
    let d: humantime::Duration = s.parse().map_err(|e| format!("{e}"))?;
    if Duration::from(d).is_zero() {
        return Err("poll interval must be greater than zero".into());
    }
    Ok(d)
}

impl Cli {
    /// True when the invocation should not start the TUI.
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.run || self.download.is_some()
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_list(&args).await;
        }
    }

    if let Some(key) = args.download.as_deref() {
        return run_download(&args, key).await;
    }
    if args.run {
        return run_follow(&args).await;
    }
    run_list(&args).await
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Build a `DashboardConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> DashboardConfig {
    DashboardConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("exec-dashboard/{}", env!("CARGO_PKG_VERSION")),
        poll_interval: Duration::from(args.poll_interval),
        max_polls: args.max_polls,
        download_dir: args.download_dir.clone().unwrap_or_else(default_download_dir),
        open_with: args.open_with.clone(),
        load_on_launch: args.load_on_launch,
        form: RunForm {
            executed_by: args.executed_by.clone(),
            script_name: args.script_name.clone(),
            user_id: args.user_id.clone(),
        },
    }
}

/// List executions for the configured script and print them.
async fn run_list(args: &Cli) -> Result<()> {
    let cfg = build_config(args);
    let client = ExecutionClient::new(&cfg).context("build API client")?;
    let records = client
        .list_executions(&cfg.form.script_name)
        .await
        .context("failed to list executions")?;
    let sorted = orchestrator::resolve::sorted_by_recency(&records);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sorted)?);
    } else {
        for line in crate::text_summary::build_records_table(&sorted).lines {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_download(args: &Cli, key: &str) -> Result<()> {
    let cfg = build_config(args);
    let client = ExecutionClient::new(&cfg).context("build API client")?;
    let settings = DownloadSettings {
        dir: cfg.download_dir.clone(),
        open_with: cfg.open_with.clone(),
    };
    let Some(outcome) = orchestrator::download_artifact(&client, &settings, key).await? else {
        eprintln!("No file key given; nothing downloaded.");
        return Ok(());
    };

    if args.json {
        let out = serde_json::json!({
            "fileKey": key,
            "url": outcome.url(),
            "result": outcome.to_message(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", outcome.to_message());
    }
    Ok(())
}

/// Start a run through the controller and report status changes until polling ends.
async fn run_follow(args: &Cli) -> Result<()> {
    let mut cfg = build_config(args);
    cfg.load_on_launch = false;
    let client = ExecutionClient::new(&cfg).context("build API client")?;

    let (out_tx, out_handle) = spawn_output_writer();
    let (state_tx, mut state_rx) = watch::channel(Dashboard::new(cfg.form.clone()));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let controller = tokio::spawn(orchestrator::run_controller(cfg, client, state_tx, cmd_rx));

    let _ = cmd_tx.send(UiCommand::StartRun);

    let mut last_status: Option<String> = None;
    let finished = loop {
        if state_rx.changed().await.is_err() {
            break None;
        }
        let snap = state_rx.borrow_and_update().clone();
        if snap.runs_started == 0 {
            continue;
        }
        if snap.current_run_id.is_some() && last_status.as_deref() != Some(snap.current_status.as_str()) {
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Run #{}: {} (poll {}/{})",
                snap.current_run_id.as_deref().unwrap_or("?"),
                snap.current_status,
                snap.polls_done,
                args.max_polls
            )));
            last_status = Some(snap.current_status.clone());
        }
        if !snap.is_running {
            break Some(snap);
        }
    };

    let _ = cmd_tx.send(UiCommand::Quit);
    controller.await.context("controller task failed")??;

    let snap = finished.context("controller stopped before the run finished")?;
    if let Some(notice) = snap.notice.as_ref() {
        drop(out_tx);
        let _ = out_handle.await;
        return Err(anyhow::anyhow!("{}", notice.message));
    }

    if args.json {
        let out = serde_json::json!({
            "id": snap.current_run_id,
            "status": snap.current_status,
            "polls": snap.polls_done,
            "record": snap.current_record,
        });
        let _ = out_tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&out)?));
    } else {
        for line in crate::text_summary::build_run_summary(&snap).lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_uses_cli_values() {
        let args = Cli::parse_from([
            "exec-dashboard",
            "--base-url",
            "https://api.example.com/Prod/automation-testing",
            "--executed-by",
            "Ops",
            "--poll-interval",
            "500ms",
            "--max-polls",
            "7",
            "--download-dir",
            "/tmp/artifacts",
            "--text",
        ]);
        let cfg = build_config(&args);
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.max_polls, 7);
        assert_eq!(cfg.form.executed_by, "Ops");
        assert_eq!(cfg.form.script_name, "AgentsValidation");
        assert_eq!(cfg.download_dir, PathBuf::from("/tmp/artifacts"));
        assert!(args.is_headless());
    }

    #[test]
    fn default_invocation_is_interactive() {
        let args = Cli::parse_from(["exec-dashboard"]);
        assert!(!args.is_headless());
        assert!(args.load_on_launch);
        assert_eq!(Duration::from(args.poll_interval), Duration::from_secs(3));
        assert_eq!(args.max_polls, 60);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = Cli::try_parse_from(["exec-dashboard", "--poll-interval", "0s"]).unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
        assert!(Cli::try_parse_from(["exec-dashboard", "--poll-interval", "soon"]).is_err());
        assert!(Cli::try_parse_from(["exec-dashboard", "--poll-interval", "1ms"]).is_ok());
    }

    #[test]
    fn run_and_download_conflict() {
        assert!(Cli::try_parse_from(["exec-dashboard", "--run", "--download", "a/b.txt"]).is_err());
    }
}

//! Dashboard controller.
//!
//! Owns the dashboard state, runs the auto-refresh timer and the HTTP calls, and
//! publishes a state snapshot to presentation layers after every change.

use super::download::{download_artifact, DownloadOutcome, DownloadSettings};
use super::poller::Poller;
use super::state::{Dashboard, Notice};
use crate::api::{ApiError, ExecutionClient};
use crate::model::{DashboardConfig, ExecutionRecord, FormField, RunForm, RunHandle};
use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

/// Intents emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    SetField { field: FormField, value: String },
    ClearForm,
    StartRun,
    Refresh,
    StartAutoRefresh,
    StopAutoRefresh,
    Download(String),
    DismissNotice,
    Quit,
}

/// Results of spawned HTTP work, fed back into the controller loop.
enum Completion {
    RunStarted {
        submitted: RunForm,
        result: Result<RunHandle, ApiError>,
    },
    Listed(Result<Vec<ExecutionRecord>, ApiError>),
    Downloaded {
        file_key: String,
        result: Result<Option<DownloadOutcome>>,
    },
}

struct Controller {
    cfg: DashboardConfig,
    client: ExecutionClient,
    downloads: DownloadSettings,
    state: Dashboard,
    poller: Poller,
    done_tx: UnboundedSender<Completion>,
}

impl Controller {
    fn spawn_refresh(&mut self) {
        let script_name = self.state.begin_refresh();
        let client = self.client.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = client.list_executions(&script_name).await;
            let _ = tx.send(Completion::Listed(result));
        });
    }

    fn spawn_run(&mut self) {
        let submitted = self.state.begin_run();
        tracing::info!(
            executed_by = %submitted.executed_by,
            script = %submitted.script_name,
            "starting run"
        );
        let client = self.client.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = client.run_script(&submitted).await;
            let _ = tx.send(Completion::RunStarted { submitted, result });
        });
    }

    fn spawn_download(&mut self, file_key: String) {
        if file_key.is_empty() {
            return;
        }
        self.state.info = format!("Resolving {file_key}…");
        let client = self.client.clone();
        let settings = self.downloads.clone();
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let result = download_artifact(&client, &settings, &file_key).await;
            let _ = tx.send(Completion::Downloaded { file_key, result });
        });
    }

    /// Start (or restart) the auto-refresh timer, replacing any previous one.
    fn start_polling(&mut self) {
        self.poller.start();
        self.state.is_auto_refreshing = true;
        self.state.polls_done = 0;
        tracing::info!(
            interval = ?self.cfg.poll_interval,
            max_polls = self.cfg.max_polls,
            "auto-refresh started"
        );
    }

    fn stop_polling(&mut self) {
        if self.poller.stop() {
            tracing::info!(polls = self.state.polls_done, "auto-refresh stopped");
        }
        self.state.is_auto_refreshing = false;
        self.state.is_running = false;
    }

    fn handle_command(&mut self, cmd: UiCommand) {
        match cmd {
            UiCommand::SetField { field, value } => self.state.set_field(field, value),
            UiCommand::ClearForm => self.state.clear_form(&self.cfg.form),
            UiCommand::StartRun => self.spawn_run(),
            UiCommand::Refresh => self.spawn_refresh(),
            UiCommand::StartAutoRefresh => self.start_polling(),
            UiCommand::StopAutoRefresh => {
                self.stop_polling();
                self.state.info = "Auto-refresh stopped".into();
            }
            UiCommand::Download(file_key) => self.spawn_download(file_key),
            UiCommand::DismissNotice => self.state.notice = None,
            // Handled by the loop.
            UiCommand::Quit => {}
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::RunStarted { submitted, result } => match result {
                Ok(handle) => {
                    tracing::info!(id = ?handle.id, "run accepted");
                    self.state.apply_run_started(&submitted, handle);
                    self.start_polling();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to start run");
                    self.state.apply_run_failed(&e);
                }
            },
            Completion::Listed(result) => match result {
                Ok(records) => {
                    tracing::debug!(count = records.len(), "executions listed");
                    let outcome = self.state.apply_records(records);
                    if !outcome.matched {
                        tracing::debug!("no listed record matches the current run");
                    }
                    // Nothing to stop while a run is still starting; its response starts polling.
                    if outcome.terminal && self.poller.is_active() {
                        tracing::info!(status = %self.state.current_status, "run reached a terminal status");
                        self.stop_polling();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to list executions");
                    self.state.refresh_failed(&e);
                }
            },
            Completion::Downloaded { file_key, result } => match result {
                Ok(Some(outcome)) => {
                    self.state.last_download_url = Some(outcome.url().to_string());
                    self.state.info = outcome.to_message();
                }
                Ok(None) => {}
                Err(e) => {
                    let detail = format!("{e:#}");
                    tracing::warn!(key = %file_key, error = %detail, "download failed");
                    self.state.info = format!("Download failed: {detail}");
                    self.state.notice = Some(Notice::new(
                        "Download failed",
                        format!("Could not download {file_key}: {detail}"),
                    ));
                }
            },
        }
    }

    fn handle_tick(&mut self, tick: u32) {
        self.state.polls_done = tick;
        tracing::debug!(tick, max = self.poller.max_ticks(), "poll tick");
        self.spawn_refresh();
        if self.poller.exhausted() {
            self.stop_polling();
            self.state.info = format!("Auto-refresh stopped after {tick} polls");
        }
    }
}

/// Run the controller until `Quit` arrives or the command channel closes.
pub(crate) async fn run_controller(
    cfg: DashboardConfig,
    client: ExecutionClient,
    state_tx: watch::Sender<Dashboard>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut ctl = Controller {
        downloads: DownloadSettings {
            dir: cfg.download_dir.clone(),
            open_with: cfg.open_with.clone(),
        },
        state: Dashboard::new(cfg.form.clone()),
        poller: Poller::new(cfg.poll_interval, cfg.max_polls),
        client,
        cfg,
        done_tx,
    };

    if ctl.cfg.load_on_launch {
        ctl.spawn_refresh();
    }
    state_tx.send_replace(ctl.state.clone());

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(UiCommand::Quit) | None => break,
                Some(cmd) => ctl.handle_command(cmd),
            },
            Some(done) = done_rx.recv() => ctl.handle_completion(done),
            tick = ctl.poller.tick() => ctl.handle_tick(tick),
        }
        state_tx.send_replace(ctl.state.clone());
    }

    // Dispose of the timer; in-flight requests finish into a closed channel.
    ctl.stop_polling();
    state_tx.send_replace(ctl.state.clone());
    Ok(())
}

mod clipboard;
mod help;
mod state;
mod views;

use crate::api::ExecutionClient;
use crate::cli::{build_config, Cli};
use crate::orchestrator::{self, resolve::sorted_by_recency, Dashboard, Notice, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{current_artifacts, UiState, TAB_DASHBOARD, TAB_EXECUTIONS, TAB_HELP};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::watch;

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = ExecutionClient::new(&cfg).context("build API client")?;

    let (state_tx, state_rx) = watch::channel(Dashboard::new(cfg.form.clone()));
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let max_polls = cfg.max_polls;
    let ui_handle = std::thread::spawn(move || run_threaded(max_polls, state_rx, cmd_tx));

    let res = orchestrator::run_controller(cfg, client, state_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// What the loop should do after a key press.
#[derive(Debug)]
enum KeyOutcome {
    Continue,
    Send(UiCommand),
    Copy(String),
    Quit,
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    max_polls: u32,
    mut state_rx: watch::Receiver<Dashboard>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut ui = UiState {
        max_polls,
        ..Default::default()
    };
    let mut snap = state_rx.borrow_and_update().clone();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut dirty = true;

    let res = loop {
        match state_rx.has_changed() {
            Ok(true) => {
                snap = state_rx.borrow_and_update().clone();
                dirty = true;
            }
            Ok(false) => {}
            // Controller is gone.
            Err(_) => break Ok(()),
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &ui, &snap)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                let visible = terminal
                    .size()
                    .map(|s| views::executions_visible_rows(s.height))
                    .unwrap_or(20);
                dirty = true;
                match handle_key(&mut ui, &snap, k, visible) {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Send(cmd) => {
                        if cmd_tx.send(cmd).is_err() {
                            break Ok(());
                        }
                    }
                    KeyOutcome::Copy(url) => {
                        ui.info = match clipboard::copy_to_clipboard(&url) {
                            Ok(()) => "✓ Copied download URL to clipboard".into(),
                            Err(e) => format!("Clipboard copy failed: {e:#}"),
                        };
                    }
                    KeyOutcome::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn is_quit(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

fn handle_key(ui: &mut UiState, snap: &Dashboard, k: KeyEvent, visible_rows: usize) -> KeyOutcome {
    if is_quit(&k) {
        return KeyOutcome::Quit;
    }

    // A notice blocks everything else until dismissed.
    if snap.notice.is_some() {
        return match k.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {
                KeyOutcome::Send(UiCommand::DismissNotice)
            }
            _ => KeyOutcome::Continue,
        };
    }

    if let Some(buf) = ui.editing.as_mut() {
        match k.code {
            KeyCode::Esc => ui.editing = None,
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Enter => {
                let value = ui.editing.take().unwrap_or_default();
                if let Some(field) = ui.focused_field() {
                    return KeyOutcome::Send(UiCommand::SetField { field, value });
                }
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    let artifacts = current_artifacts(snap);
    ui.clamp_focus(artifacts.len());

    match k.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Tab => {
            ui.tab = (ui.tab + 1) % 3;
            if ui.tab == TAB_EXECUTIONS {
                ui.history_selected = 0;
                ui.history_scroll_offset = 0;
            }
        }
        KeyCode::Char('?') => ui.tab = TAB_HELP,
        KeyCode::Char('r') => {
            if snap.is_running {
                ui.info = "A run is already in progress".into();
            } else {
                ui.info.clear();
                return KeyOutcome::Send(UiCommand::StartRun);
            }
        }
        KeyCode::Char('f') => {
            if !snap.is_refreshing() {
                return KeyOutcome::Send(UiCommand::Refresh);
            }
        }
        KeyCode::Char('a') => {
            return KeyOutcome::Send(if snap.is_auto_refreshing {
                UiCommand::StopAutoRefresh
            } else {
                UiCommand::StartAutoRefresh
            });
        }
        KeyCode::Char('c') => return KeyOutcome::Send(UiCommand::ClearForm),
        KeyCode::Char('y') => match snap.last_download_url.as_ref() {
            Some(url) => return KeyOutcome::Copy(url.clone()),
            None => ui.info = "No download URL to copy yet".into(),
        },
        KeyCode::Up | KeyCode::Char('k') => match ui.tab {
            TAB_DASHBOARD => ui.move_focus(artifacts.len(), false),
            TAB_EXECUTIONS => ui.select_history(snap.records.len(), false, visible_rows),
            _ => {}
        },
        KeyCode::Down | KeyCode::Char('j') => match ui.tab {
            TAB_DASHBOARD => ui.move_focus(artifacts.len(), true),
            TAB_EXECUTIONS => ui.select_history(snap.records.len(), true, visible_rows),
            _ => {}
        },
        KeyCode::Enter | KeyCode::Char('e') if ui.tab == TAB_DASHBOARD => {
            if let Some(field) = ui.focused_field() {
                ui.editing = Some(snap.form.get(field).to_string());
            } else if let Some(artifact) = ui.focused_artifact().and_then(|i| artifacts.get(i)) {
                match artifact.file_key.as_ref() {
                    Some(key) => return KeyOutcome::Send(UiCommand::Download(key.clone())),
                    None => ui.info = format!("{} has no file to download", artifact.title),
                }
            }
        }
        KeyCode::Enter | KeyCode::Char('p') | KeyCode::Char('l') if ui.tab == TAB_EXECUTIONS => {
            let sorted = sorted_by_recency(&snap.records);
            if let Some(record) = sorted.get(ui.history_selected) {
                let want_log = k.code == KeyCode::Char('l');
                let key = if want_log {
                    record.log_file()
                } else {
                    record.primary_artifact()
                };
                match key {
                    Some(key) => return KeyOutcome::Send(UiCommand::Download(key.to_string())),
                    None => {
                        ui.info = if want_log {
                            "Selected execution has no log file".into()
                        } else {
                            "Selected execution has no report".into()
                        }
                    }
                }
            }
        }
        _ => {}
    }
    KeyOutcome::Continue
}

fn draw(area: Rect, f: &mut ratatui::Frame, ui: &UiState, snap: &Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("Executions"),
        Line::from("Help"),
    ])
    .select(ui.tab)
    .block(Block::default().borders(Borders::ALL).title("exec-dashboard"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match ui.tab {
        TAB_DASHBOARD => views::draw_dashboard(chunks[1], f, ui, snap),
        TAB_EXECUTIONS => views::draw_executions(chunks[1], f, ui, snap),
        _ => help::draw_help(chunks[1], f),
    }

    if let Some(notice) = snap.notice.as_ref() {
        draw_notice(area, f, notice);
    }
}

fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = area.width * width_pct / 100;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_notice(area: Rect, f: &mut ratatui::Frame, notice: &Notice) {
    let popup = centered(area, 60, 8);
    let p = Paragraph::new(vec![
        Line::from(notice.message.clone()),
        Line::from(""),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("enter", Style::default().fg(Color::Magenta)),
            Span::raw(" to dismiss"),
        ]),
    ])
    .wrap(Wrap { trim: false })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(notice.title.clone()),
    );
    f.render_widget(Clear, popup);
    f.render_widget(p, popup);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormField, RunForm};
    use crate::test_support::record;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn snap() -> Dashboard {
        Dashboard::new(RunForm {
            executed_by: "Ops".into(),
            script_name: "AgentsValidation".into(),
            user_id: String::new(),
        })
    }

    #[test]
    fn run_key_is_ignored_while_running() {
        let mut ui = UiState::default();
        let mut d = snap();
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Char('r')), 10),
            KeyOutcome::Send(UiCommand::StartRun)
        ));
        d.is_running = true;
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Char('r')), 10),
            KeyOutcome::Continue
        ));
        assert!(!ui.info.is_empty());
    }

    #[test]
    fn editing_a_field_sends_its_value() {
        let mut ui = UiState::default();
        let d = snap();
        ui.move_focus(0, true);
        handle_key(&mut ui, &d, key(KeyCode::Enter), 10);
        assert_eq!(ui.editing.as_deref(), Some("AgentsValidation"));
        for _ in 0.."Validation".len() {
            handle_key(&mut ui, &d, key(KeyCode::Backspace), 10);
        }
        // Letters that are shortcuts elsewhere are typed while editing.
        for c in "Smoke".chars() {
            handle_key(&mut ui, &d, key(KeyCode::Char(c)), 10);
        }
        match handle_key(&mut ui, &d, key(KeyCode::Enter), 10) {
            KeyOutcome::Send(UiCommand::SetField { field, value }) => {
                assert_eq!(field, FormField::ScriptName);
                assert_eq!(value, "AgentsSmoke");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ui.editing.is_none());
    }

    #[test]
    fn notice_swallows_keys_until_dismissed() {
        let mut ui = UiState::default();
        let mut d = snap();
        d.notice = Some(Notice::new("Run failed", "boom"));
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Char('r')), 10),
            KeyOutcome::Continue
        ));
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Enter), 10),
            KeyOutcome::Send(UiCommand::DismissNotice)
        ));
        assert!(matches!(
            handle_key(
                &mut ui,
                &d,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
                10
            ),
            KeyOutcome::Quit
        ));
    }

    #[test]
    fn executions_tab_downloads_selected_artifacts() {
        let mut ui = UiState {
            tab: TAB_EXECUTIONS,
            ..Default::default()
        };
        let mut d = snap();
        let mut newer = record("2", "Ops", "AgentsValidation", "Pass", "2025-02-01T00:00:00Z");
        newer.log_file_path = Some("AgentsValidation/2/log.txt".into());
        let older = record("1", "Ops", "AgentsValidation", "Pass", "2025-01-01T00:00:00Z");
        d.records = vec![older, newer];

        match handle_key(&mut ui, &d, key(KeyCode::Char('l')), 10) {
            KeyOutcome::Send(UiCommand::Download(k)) => assert_eq!(k, "AgentsValidation/2/log.txt"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Char('p')), 10),
            KeyOutcome::Continue
        ));
        assert_eq!(ui.info, "Selected execution has no report");
    }

    #[test]
    fn auto_refresh_key_toggles() {
        let mut ui = UiState::default();
        let mut d = snap();
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Char('a')), 10),
            KeyOutcome::Send(UiCommand::StartAutoRefresh)
        ));
        d.is_auto_refreshing = true;
        assert!(matches!(
            handle_key(&mut ui, &d, key(KeyCode::Char('a')), 10),
            KeyOutcome::Send(UiCommand::StopAutoRefresh)
        ));
    }
}

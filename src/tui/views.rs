use super::state::{current_artifacts, push_wrapped_status_kv, status_span, ArtifactKind, UiState};
use crate::model::{display_status, non_empty, FormField, StatusClass};
use crate::orchestrator::{resolve::sorted_by_recency, Dashboard};
use crate::timestamp::format_timestamp;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

fn key_style() -> Style {
    Style::default().fg(Color::Magenta)
}

fn disabled_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn focus_marker(focused: bool) -> Span<'static> {
    if focused {
        Span::styled("▶ ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("  ")
    }
}

pub fn draw_dashboard(area: Rect, f: &mut Frame, ui: &UiState, snap: &Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(6),
            Constraint::Length(7),
        ])
        .split(area);

    draw_form(chunks[0], f, ui, snap);
    draw_current_run(chunks[1], f, ui, snap);
    draw_status(chunks[2], f, ui, snap);
}

fn action_buttons(snap: &Dashboard) -> Line<'static> {
    let mut spans = Vec::new();
    if snap.is_running && !snap.is_auto_refreshing {
        spans.push(Span::styled("Starting…", disabled_style()));
    } else if snap.is_running {
        spans.push(Span::styled("Running…", disabled_style()));
    } else {
        spans.push(Span::styled("[r]", key_style()));
        spans.push(Span::styled(" Run Script", Style::default().fg(Color::Green)));
    }
    spans.push(Span::raw("   "));
    if snap.is_refreshing() {
        spans.push(Span::styled("Refreshing…", disabled_style()));
    } else {
        spans.push(Span::styled("[f]", key_style()));
        spans.push(Span::raw(" Refresh"));
    }
    spans.push(Span::raw("   "));
    spans.push(Span::styled("[a]", key_style()));
    spans.push(Span::raw(if snap.is_auto_refreshing {
        " Stop Auto-Refresh"
    } else {
        " Auto-Refresh"
    }));
    spans.push(Span::raw("   "));
    spans.push(Span::styled("[c]", key_style()));
    spans.push(Span::raw(" Clear"));
    Line::from(spans)
}

fn draw_form(area: Rect, f: &mut Frame, ui: &UiState, snap: &Dashboard) {
    let mut lines = Vec::new();
    for (i, field) in FormField::ALL.iter().enumerate() {
        let focused = ui.focus == i && ui.tab == super::state::TAB_DASHBOARD;
        let label_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let value = match (&ui.editing, focused) {
            (Some(buf), true) => Span::styled(
                format!("{buf}█"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            _ => {
                let v = snap.form.get(*field);
                if v.is_empty() {
                    Span::styled("(empty)", disabled_style())
                } else {
                    Span::raw(v.to_string())
                }
            }
        };
        lines.push(Line::from(vec![
            focus_marker(focused),
            Span::styled(format!("{:<12}", field.label()), label_style),
            value,
        ]));
    }
    lines.push(Line::from(""));
    lines.push(action_buttons(snap));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Run"));
    f.render_widget(p, area);
}

fn draw_current_run(area: Rect, f: &mut Frame, ui: &UiState, snap: &Dashboard) {
    let title = match snap.current_run_id.as_deref() {
        Some(id) => format!("Current Run #{id}"),
        None => "Current Run".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if snap.current_run_id.is_none() && snap.current_record.is_none() {
        let p = Paragraph::new(vec![
            Line::from(""),
            Line::from(vec![
                Span::raw("No run started yet. Press "),
                Span::styled("r", key_style()),
                Span::raw(format!(" to run {}.", snap.form.script_name)),
            ]),
        ])
        .block(block);
        f.render_widget(p, area);
        return;
    }

    let record = snap.current_record.as_ref();
    let mut lines = Vec::new();

    let mut status_line = vec![Span::raw("Status: "), status_span(&snap.current_status)];
    if snap.is_auto_refreshing {
        status_line.push(Span::styled(
            format!("   (poll {}/{})", snap.polls_done, ui.max_polls),
            disabled_style(),
        ));
    }
    lines.push(Line::from(status_line));

    let executed_by = record
        .and_then(|r| non_empty(r.executed_by.as_deref()))
        .or(snap.current_run_executed_by.as_deref())
        .unwrap_or("—");
    let script = record
        .and_then(|r| non_empty(r.script_name.as_deref()))
        .or(snap.current_run_script_name.as_deref())
        .unwrap_or("—");
    lines.push(Line::from(format!("Executed By: {executed_by}   Script: {script}")));
    let started = record
        .and_then(|r| non_empty(r.timestamp.as_deref()))
        .or(snap.current_run_timestamp.as_deref());
    if let Some(ts) = started {
        lines.push(Line::from(format!("Started: {}", format_timestamp(ts))));
    }

    let artifacts = current_artifacts(snap);
    let base = FormField::ALL.len();
    let artifact_line = |i: usize, title: &str, detail: &str, downloadable: bool| {
        let focused = ui.tab == super::state::TAB_DASHBOARD && ui.focus == base + i;
        let mut spans = vec![
            Span::raw("  "),
            focus_marker(focused),
            Span::styled(title.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        ];
        if !detail.is_empty() {
            spans.push(Span::raw(format!(": {detail}")));
        }
        if !downloadable {
            spans.push(Span::styled("  (no file)", disabled_style()));
        }
        Line::from(spans)
    };

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Results",
        Style::default().fg(Color::Cyan),
    )));
    let mut any_result = false;
    for (i, a) in artifacts.iter().enumerate() {
        if a.kind == ArtifactKind::Result {
            any_result = true;
            lines.push(artifact_line(i, &a.title, &a.detail, a.file_key.is_some()));
        }
    }
    if !any_result {
        let waiting = StatusClass::of(Some(&snap.current_status)) == StatusClass::Running;
        lines.push(Line::from(Span::styled(
            if waiting {
                "  No results yet. Waiting for the script to finish…"
            } else {
                "  No results."
            },
            disabled_style(),
        )));
    }

    lines.push(Line::from(Span::styled("Logs", Style::default().fg(Color::Cyan))));
    match artifacts
        .iter()
        .enumerate()
        .find(|(_, a)| a.kind == ArtifactKind::Log)
    {
        Some((i, a)) => lines.push(artifact_line(i, &a.title, &a.detail, true)),
        None => lines.push(Line::from(Span::styled(
            "  Log file not available yet.",
            disabled_style(),
        ))),
    }

    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut Frame, ui: &UiState, snap: &Dashboard) {
    let mut lines = Vec::new();
    let auto = if snap.is_auto_refreshing {
        format!("ON (poll {}/{})", snap.polls_done, ui.max_polls)
    } else {
        "OFF".to_string()
    };
    lines.push(Line::from(vec![
        Span::styled("Executions:", Style::default().fg(Color::Gray)),
        Span::raw(format!(" {}   ", snap.records.len())),
        Span::styled("Auto-refresh:", Style::default().fg(Color::Gray)),
        Span::raw(format!(" {auto}")),
    ]));
    push_wrapped_status_kv(&mut lines, "Info", &snap.info, area.width);
    push_wrapped_status_kv(&mut lines, "Note", &ui.info, area.width);
    if let Some(url) = snap.last_download_url.as_deref() {
        push_wrapped_status_kv(&mut lines, "Last URL", url, area.width);
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

/// Rows that fit in the executions table for a terminal of the given height
/// (tab bar, table borders and header excluded).
pub fn executions_visible_rows(terminal_height: u16) -> usize {
    (terminal_height as usize).saturating_sub(3 + 3).max(1)
}

pub fn draw_executions(area: Rect, f: &mut Frame, ui: &UiState, snap: &Dashboard) {
    let sorted = sorted_by_recency(&snap.records);
    let visible = (area.height as usize).saturating_sub(3).max(1);
    let total = sorted.len();
    let title = format!(
        "Executions ({}/{}) - ↑/↓ select, enter/p report, l log, f refresh",
        if total == 0 { 0 } else { ui.history_selected + 1 },
        total
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if sorted.is_empty() {
        let msg = if snap.is_refreshing() {
            "Loading executions…"
        } else {
            "No executions found. Press f to refresh."
        };
        f.render_widget(Paragraph::new(msg).block(block), area);
        return;
    }

    // Keep the selection visible even if the terminal shrank since the last key press.
    let mut offset = ui.history_scroll_offset.min(total.saturating_sub(1));
    if ui.history_selected >= offset + visible {
        offset = ui.history_selected + 1 - visible;
    }

    let header = Row::new(vec![
        Cell::from("#"),
        Cell::from("Executed By"),
        Cell::from("Status"),
        Cell::from("Last Modified At"),
        Cell::from("Artifacts"),
    ])
    .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = sorted
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, r)| {
            let mut artifacts = Vec::new();
            if r.primary_artifact().is_some() {
                artifacts.push("PDF");
            }
            if r.log_file().is_some() {
                artifacts.push("Log");
            }
            let row = Row::new(vec![
                Cell::from(r.id.clone().unwrap_or_else(|| "—".into())),
                Cell::from(
                    non_empty(r.executed_by.as_deref())
                        .unwrap_or("—")
                        .to_string(),
                ),
                Cell::from(status_span(display_status(r.status.as_deref()))),
                Cell::from(
                    r.recency_field()
                        .map(format_timestamp)
                        .unwrap_or_else(|| "—".into()),
                ),
                Cell::from(if artifacts.is_empty() {
                    "—".to_string()
                } else {
                    artifacts.join(" ")
                }),
            ]);
            if i == ui.history_selected {
                row.style(Style::default().bg(Color::DarkGray))
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Percentage(30),
            Constraint::Length(14),
            Constraint::Length(21),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}

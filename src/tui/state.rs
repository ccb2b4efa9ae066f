use crate::model::{non_empty, FormField, StatusClass};
use crate::orchestrator::Dashboard;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub const TAB_DASHBOARD: usize = 0;
pub const TAB_EXECUTIONS: usize = 1;
pub const TAB_HELP: usize = 2;

/// Presentation-only state. Owned by the UI thread; the dashboard itself lives in the controller.
pub struct UiState {
    pub tab: usize,
    /// Position in the dashboard focus ring: form fields first, then current-run artifacts.
    pub focus: usize,
    /// Edit buffer for the focused form field.
    pub editing: Option<String>,
    pub history_selected: usize, // 0 = most recent
    pub history_scroll_offset: usize,
    /// Local feedback (clipboard, disabled actions) shown next to the controller's info line.
    pub info: String,
    pub max_polls: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_DASHBOARD,
            focus: 0,
            editing: None,
            history_selected: 0,
            history_scroll_offset: 0,
            info: String::new(),
            max_polls: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Result,
    Log,
}

/// A downloadable entry of the current run panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub title: String,
    pub detail: String,
    pub file_key: Option<String>,
}

/// Result artifacts in order, then the log file when the record has one.
pub fn current_artifacts(snap: &Dashboard) -> Vec<Artifact> {
    let Some(record) = snap.current_record.as_ref() else {
        return Vec::new();
    };
    let mut out: Vec<Artifact> = record
        .results()
        .iter()
        .map(|item| Artifact {
            kind: ArtifactKind::Result,
            title: item.title().to_string(),
            detail: item.detail().to_string(),
            file_key: non_empty(item.file_path.as_deref()).map(str::to_string),
        })
        .collect();
    if let Some(log) = record.log_file() {
        out.push(Artifact {
            kind: ArtifactKind::Log,
            title: "Log file".into(),
            detail: log.to_string(),
            file_key: Some(log.to_string()),
        });
    }
    out
}

impl UiState {
    pub fn focus_len(artifacts: usize) -> usize {
        FormField::ALL.len() + artifacts
    }

    pub fn focused_field(&self) -> Option<FormField> {
        FormField::ALL.get(self.focus).copied()
    }

    pub fn focused_artifact(&self) -> Option<usize> {
        self.focus.checked_sub(FormField::ALL.len())
    }

    /// Keep focus inside the ring after the artifact list shrinks.
    pub fn clamp_focus(&mut self, artifacts: usize) {
        let max = Self::focus_len(artifacts) - 1;
        if self.focus > max {
            self.focus = max;
        }
    }

    pub fn move_focus(&mut self, artifacts: usize, down: bool) {
        let len = Self::focus_len(artifacts);
        self.focus = if down {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
    }

    pub fn select_history(&mut self, total: usize, down: bool, visible: usize) {
        if total == 0 {
            self.history_selected = 0;
            self.history_scroll_offset = 0;
            return;
        }
        if down {
            if self.history_selected < total - 1 {
                self.history_selected += 1;
            }
        } else {
            self.history_selected = self.history_selected.saturating_sub(1);
        }
        self.history_selected = self.history_selected.min(total - 1);
        if self.history_selected < self.history_scroll_offset {
            self.history_scroll_offset = self.history_selected;
        }
        let visible = visible.max(1);
        if self.history_selected >= self.history_scroll_offset + visible {
            self.history_scroll_offset = self.history_selected + 1 - visible;
        }
    }
}

pub fn status_color(class: StatusClass) -> Color {
    match class {
        StatusClass::Success => Color::Green,
        StatusClass::Running => Color::Yellow,
        StatusClass::Failure => Color::Red,
        StatusClass::Neutral => Color::Gray,
    }
}

pub fn status_span(status: &str) -> Span<'static> {
    let class = StatusClass::of(Some(status));
    Span::styled(status.to_string(), Style::default().fg(status_color(class)))
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Borders plus padding.
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let take = (remaining.len() as u16).min(line_width) as usize;
        let (chunk, rest) = remaining.split_at(take);
        let text: String = chunk.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(text)]));
        }
        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResultItem, RunForm};
    use crate::test_support::record;

    #[test]
    fn artifacts_list_results_then_log() {
        let mut d = Dashboard::new(RunForm::default());
        let mut r = record("1", "Ops", "AgentsValidation", "Pass", "");
        r.script_result = Some(vec![
            ResultItem {
                sub_script: Some("Checks".into()),
                description: Some("Agent checks".into()),
                file_path: Some("a/1/checks.pdf".into()),
            },
            ResultItem::default(),
        ]);
        r.log_file_path = Some("a/1/log.txt".into());
        d.current_record = Some(r);

        let items = current_artifacts(&d);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Checks");
        assert_eq!(items[1].title, "Result");
        assert_eq!(items[1].file_key, None);
        assert_eq!(items[2].kind, ArtifactKind::Log);
    }

    #[test]
    fn focus_ring_wraps_and_clamps() {
        let mut ui = UiState::default();
        ui.move_focus(1, false);
        assert_eq!(ui.focused_artifact(), Some(0));
        ui.move_focus(1, true);
        assert_eq!(ui.focused_field(), Some(FormField::ExecutedBy));
        ui.focus = 5;
        ui.clamp_focus(0);
        assert_eq!(ui.focused_field(), Some(FormField::UserId));
    }

    #[test]
    fn history_selection_scrolls_window() {
        let mut ui = UiState::default();
        for _ in 0..4 {
            ui.select_history(10, true, 3);
        }
        assert_eq!(ui.history_selected, 4);
        assert_eq!(ui.history_scroll_offset, 2);
        for _ in 0..10 {
            ui.select_history(10, false, 3);
        }
        assert_eq!((ui.history_selected, ui.history_scroll_offset), (0, 0));
    }

    #[test]
    fn wrapped_lines_respect_width() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Info", &"x".repeat(30), 20);
        assert!(out.len() > 1);
        push_wrapped_status_kv(&mut out, "Empty", "   ", 20);
        let before = out.len();
        push_wrapped_status_kv(&mut out, "Empty", "", 20);
        assert_eq!(out.len(), before);
    }
}

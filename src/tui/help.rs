use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(keys: &[&'static str], pad: usize, action: &'static str) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    let mut width = 0;
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" / "));
            width += 3;
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Magenta)));
        width += key.chars().count();
    }
    spans.push(Span::raw(" ".repeat(pad.saturating_sub(width).max(1))));
    spans.push(Span::raw(action));
    Line::from(spans)
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    const PAD: usize = 14;
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line(&["q", "Ctrl-C"], PAD, "Quit"),
        key_line(&["r"], PAD, "Run script"),
        key_line(&["f"], PAD, "Refresh executions"),
        key_line(&["a"], PAD, "Start/stop auto-refresh"),
        key_line(&["c"], PAD, "Clear form"),
        key_line(&["y"], PAD, "Copy last download URL"),
        key_line(&["tab"], PAD, "Switch tabs"),
        key_line(&["?"], PAD, "Show this help"),
        Line::from(""),
        Line::from("Dashboard tab:"),
        key_line(&["↑/↓", "j/k"], PAD, "Move between fields and artifacts"),
        key_line(&["enter", "e"], PAD, "Edit field / download artifact"),
        key_line(&["esc"], PAD, "Cancel edit"),
        Line::from(""),
        Line::from("Executions tab:"),
        key_line(&["↑/↓", "j/k"], PAD, "Navigate"),
        key_line(&["enter", "p"], PAD, "Download report"),
        key_line(&["l"], PAD, "Download log"),
        Line::from(""),
        Line::from("Text artifacts are saved to the download directory; others open externally."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}

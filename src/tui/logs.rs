//! Logs view - captured tracing output.

use super::state::LogBuffer;
use super::Theme;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Render the logs view.
pub fn render(frame: &mut Frame, area: Rect, log_buffer: &LogBuffer, theme: &Theme) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines = log_buffer.recent(visible.max(1));

    if lines.is_empty() {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled("No logs yet.", theme.muted())),
        ];
        let block = Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title("📋 Logs")
                .border_style(theme.border()),
        );
        frame.render_widget(block, area);
        return;
    }

    let items: Vec<ListItem> = lines
        .into_iter()
        .map(|line| {
            let style = if line.contains("ERROR") {
                theme.error()
            } else if line.contains("WARN") {
                theme.warning()
            } else if line.contains("DEBUG") || line.contains("TRACE") {
                theme.muted()
            } else {
                Default::default()
            };
            ListItem::new(Line::from(Span::styled(line, style)))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("📋 Logs")
            .border_style(theme.border()),
    );
    frame.render_widget(list, area);
}

//! History view - accuracy ranking over the analysis log.

use super::Theme;
use crate::services::{HistoryView, LogRow, Section, StatRow, Tone};
use crate::types::PredictionOutcome;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

/// Render the history view.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    history: Option<&HistoryView>,
    loading: bool,
    theme: &Theme,
) {
    let Some(history) = history else {
        let text = if loading { "Loading history..." } else { "Press r to load the history." };
        let placeholder =
            Paragraph::new(vec![Line::from(""), Line::from(Span::styled(text, theme.muted()))])
                .block(block("🏆 History", theme));
        frame.render_widget(placeholder, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let ranking_title = if loading { "🏆 Accuracy (refreshing)" } else { "🏆 Accuracy" };
    match &history.stats {
        Section::Rows(rows) => frame.render_widget(stats_table(rows, ranking_title, theme), chunks[0]),
        Section::Empty(message) => render_message(frame, chunks[0], ranking_title, message, theme.muted(), theme),
        Section::Failed(message) => render_message(frame, chunks[0], ranking_title, message, theme.error(), theme),
    }

    match &history.log {
        Section::Rows(rows) => frame.render_widget(log_table(rows, theme), chunks[1]),
        Section::Empty(message) => render_message(frame, chunks[1], "📜 Log", message, theme.muted(), theme),
        Section::Failed(message) => render_message(frame, chunks[1], "📜 Log", message, theme.error(), theme),
    }
}

fn block<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(theme.border())
}

fn render_message(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    message: &str,
    style: Style,
    theme: &Theme,
) {
    let text = vec![Line::from(""), Line::from(Span::styled(message.to_string(), style))];
    frame.render_widget(Paragraph::new(text).block(block(title, theme)), area);
}

fn header<'a>(titles: &[&'a str], theme: &Theme) -> Row<'a> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(theme.header())
        .height(1)
}

fn stats_table<'a>(rows: &'a [StatRow], title: &'a str, theme: &Theme) -> Table<'a> {
    let rows = rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.ticker.as_str()),
            Cell::from(row.total.as_str()),
            Cell::from(row.accuracy.as_str()).style(theme.tone(row.accuracy_tone)),
            Cell::from(row.avg_error.as_str()),
        ])
    });

    Table::new(
        rows,
        [
            Constraint::Min(10),    // Ticker
            Constraint::Length(8),  // Total
            Constraint::Length(10), // Accuracy
            Constraint::Length(12), // Avg error
        ],
    )
    .header(header(&["Ticker", "Total", "Accuracy", "Avg error"], theme))
    .block(block(title, theme))
}

fn outcome_tone(outcome: PredictionOutcome) -> Tone {
    match outcome {
        PredictionOutcome::Hit => Tone::Gain,
        PredictionOutcome::Miss => Tone::Loss,
        PredictionOutcome::Pending => Tone::Neutral,
    }
}

fn log_table<'a>(rows: &'a [LogRow], theme: &Theme) -> Table<'a> {
    let rows = rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.date.as_str()).style(theme.muted()),
            Cell::from(row.target_date.as_str()),
            Cell::from(row.ticker.as_str()),
            Cell::from(row.indicators.join(" · ")).style(theme.muted()),
            Cell::from(row.predicted.as_str()),
            Cell::from(row.real.as_str()),
            Cell::from(row.outcome.icon()).style(theme.tone(outcome_tone(row.outcome))),
        ])
    });

    Table::new(
        rows,
        [
            Constraint::Length(11), // Date
            Constraint::Length(11), // Target
            Constraint::Length(8),  // Ticker
            Constraint::Min(16),    // Indicators
            Constraint::Length(12), // Predicted
            Constraint::Length(12), // Real
            Constraint::Length(4),  // Status
        ],
    )
    .header(header(
        &["Date", "Target", "Ticker", "Indicators", "Predicted", "Real", ""],
        theme,
    ))
    .block(block("📜 Log", theme))
}

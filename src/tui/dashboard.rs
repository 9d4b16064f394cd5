//! Dashboard view - analysis result and chart.

use super::chart::{ChartWidget, TerminalRenderer};
use super::Theme;
use crate::services::{DashboardFields, DashboardPresenter};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the dashboard view.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    presenter: &DashboardPresenter<TerminalRenderer>,
    theme: &Theme,
) {
    let Some(fields) = presenter.fields() else {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled("No analysis yet.", theme.muted())),
            Line::from(Span::styled(
                "Run one from the form (F1).",
                theme.muted(),
            )),
        ];
        let block = Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .title("📊 Dashboard")
                .border_style(theme.border()),
        );
        frame.render_widget(block, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Title + result cards
            Constraint::Min(0),    // Chart
        ])
        .split(area);

    render_cards(frame, chunks[0], fields, theme);

    match presenter.renderer().current() {
        Some(spec) => frame.render_widget(ChartWidget::new(spec), chunks[1]),
        None => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(theme.muted());
            frame.render_widget(block, chunks[1]);
        }
    }
}

fn render_cards(frame: &mut Frame, area: Rect, fields: &DashboardFields, theme: &Theme) {
    let header = Block::default()
        .borders(Borders::TOP)
        .title(Span::styled(format!(" {} ", fields.title), theme.title()))
        .border_style(theme.border());
    let inner = header.inner(area);
    frame.render_widget(header, area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(inner);

    let signal = vec![
        Line::from(Span::styled(fields.signal.clone(), theme.tone(fields.signal_tone))),
        Line::from(vec![
            Span::styled("Confidence: ", theme.muted()),
            Span::raw(fields.confidence.clone()),
        ]),
    ];
    let prices = vec![
        Line::from(vec![
            Span::styled("Current:   ", theme.muted()),
            Span::raw(fields.current_price.clone()),
        ]),
        Line::from(vec![
            Span::styled("Predicted: ", theme.muted()),
            Span::raw(fields.predicted_price.clone()),
        ]),
    ];
    let variation = vec![Line::from(Span::styled(
        fields.variation.clone(),
        theme.tone(fields.variation_tone),
    ))];
    let horizon = vec![Line::from(fields.horizon.clone())];

    let card = |title: &'static str, lines: Vec<Line<'static>>| {
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(theme.border()),
        )
    };

    frame.render_widget(card("🎯 Signal", signal), cards[0]);
    frame.render_widget(card("💰 Price", prices), cards[1]);
    frame.render_widget(card("📈 Variation", variation), cards[2]);
    frame.render_widget(card("⏳ Horizon", horizon), cards[3]);
}

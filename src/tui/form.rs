//! Entry form view - ticker and analysis parameters.

use super::Theme;
use crate::error::{AppError, Result};
use crate::services::{normalize_ticker, ProgressUpdate};
use crate::types::{AnalysisParams, ChartType, HorizonUnit, IndicatorKind, RiskProfile};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

const MAX_TICKER_LEN: usize = 12;
const MAX_DAYS_LEN: usize = 4;

/// Form field with keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Ticker,
    Days,
    Unit,
    ChartType,
    Indicators,
    Profile,
}

impl FormField {
    const ORDER: [FormField; 6] = [
        FormField::Ticker,
        FormField::Days,
        FormField::Unit,
        FormField::ChartType,
        FormField::Indicators,
        FormField::Profile,
    ];

    fn position(&self) -> usize {
        Self::ORDER.iter().position(|f| f == self).unwrap_or(0)
    }

    fn next(&self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    fn previous(&self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    fn label(&self) -> &'static str {
        match self {
            FormField::Ticker => "Ticker",
            FormField::Days => "Horizon",
            FormField::Unit => "Unit",
            FormField::ChartType => "Chart",
            FormField::Indicators => "Indicators",
            FormField::Profile => "Risk profile",
        }
    }
}

/// What the app should do after a key press on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Submit,
    Cancel,
}

/// A validated form submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub params: AnalysisParams,
    pub chart_type: ChartType,
}

/// Editable analysis parameters.
#[derive(Debug, Clone)]
pub struct AnalysisForm {
    pub ticker: String,
    pub days: String,
    pub unit: HorizonUnit,
    pub chart_type: ChartType,
    /// Selection flag per entry of [`IndicatorKind::ALL`].
    pub indicators: [bool; 5],
    pub profile: RiskProfile,
    focus: FormField,
    indicator_cursor: usize,
}

impl Default for AnalysisForm {
    fn default() -> Self {
        let defaults = AnalysisParams::default();
        let mut indicators = [false; 5];
        for (flag, kind) in indicators.iter_mut().zip(IndicatorKind::ALL) {
            *flag = defaults.indicators.contains(&kind);
        }

        Self {
            ticker: String::new(),
            days: defaults.days.to_string(),
            unit: defaults.timeframe,
            chart_type: ChartType::default(),
            indicators,
            profile: defaults.profile,
            focus: FormField::Ticker,
            indicator_cursor: 0,
        }
    }
}

impl AnalysisForm {
    pub fn focus(&self) -> FormField {
        self.focus
    }

    /// Apply a key press.
    pub fn handle_key(&mut self, key: &KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Enter => return FormAction::Submit,
            KeyCode::Esc => return FormAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.previous(),
            KeyCode::Left => self.cycle(false),
            KeyCode::Right => self.cycle(true),
            KeyCode::Backspace => match self.focus {
                FormField::Ticker => {
                    self.ticker.pop();
                }
                FormField::Days => {
                    self.days.pop();
                }
                _ => {}
            },
            KeyCode::Char(' ') if self.focus == FormField::Indicators => {
                let flag = &mut self.indicators[self.indicator_cursor];
                *flag = !*flag;
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.type_char(c)
            }
            _ => {}
        }
        FormAction::None
    }

    fn type_char(&mut self, c: char) {
        match self.focus {
            FormField::Ticker if self.ticker.len() < MAX_TICKER_LEN => {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    self.ticker.push(c.to_ascii_uppercase());
                }
            }
            FormField::Days if self.days.len() < MAX_DAYS_LEN && c.is_ascii_digit() => {
                self.days.push(c);
            }
            _ => {}
        }
    }

    fn cycle(&mut self, forward: bool) {
        match self.focus {
            FormField::Unit => {
                self.unit = if forward {
                    self.unit.next()
                } else {
                    // Three steps forward is one step back.
                    self.unit.next().next().next()
                };
            }
            FormField::ChartType => self.chart_type = self.chart_type.toggled(),
            FormField::Indicators => {
                let len = IndicatorKind::ALL.len();
                self.indicator_cursor = if forward {
                    (self.indicator_cursor + 1) % len
                } else {
                    (self.indicator_cursor + len - 1) % len
                };
            }
            FormField::Profile => {
                self.profile = if forward {
                    self.profile.next()
                } else {
                    self.profile.next().next()
                };
            }
            FormField::Ticker | FormField::Days => {}
        }
    }

    pub fn selected_indicators(&self) -> Vec<IndicatorKind> {
        IndicatorKind::ALL
            .into_iter()
            .zip(self.indicators)
            .filter_map(|(kind, selected)| selected.then_some(kind))
            .collect()
    }

    /// Validate the form into a request.
    pub fn to_request(&self) -> Result<AnalysisRequest> {
        let ticker = normalize_ticker(&self.ticker)?;
        let days: u32 = self
            .days
            .parse()
            .ok()
            .filter(|&d| d > 0)
            .ok_or_else(|| AppError::BadRequest("Horizon must be a positive number.".to_string()))?;

        Ok(AnalysisRequest {
            ticker,
            params: AnalysisParams {
                days,
                timeframe: self.unit,
                indicators: self.selected_indicators(),
                profile: self.profile,
            },
            chart_type: self.chart_type,
        })
    }
}

/// Render the form view.
pub fn render(
    frame: &mut Frame,
    area: Rect,
    form: &AnalysisForm,
    progress: Option<&ProgressUpdate>,
    theme: &Theme,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Fields
            Constraint::Length(3),  // Progress
            Constraint::Min(0),     // Help
        ])
        .split(area);

    render_fields(frame, chunks[0], form, theme);
    render_progress(frame, chunks[1], progress, theme);

    let help = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Tab/↑↓", theme.muted()),
            Span::raw(" move  "),
            Span::styled("←→", theme.muted()),
            Span::raw(" change  "),
            Span::styled("Space", theme.muted()),
            Span::raw(" toggle indicator  "),
            Span::styled("Enter", theme.muted()),
            Span::raw(" analyze  "),
            Span::styled("Esc", theme.muted()),
            Span::raw(" cancel"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).border_style(theme.muted()));
    frame.render_widget(help, chunks[2]);
}

fn render_fields(frame: &mut Frame, area: Rect, form: &AnalysisForm, theme: &Theme) {
    let indicator_spans: Vec<Span> = IndicatorKind::ALL
        .iter()
        .zip(form.indicators)
        .enumerate()
        .flat_map(|(i, (kind, selected))| {
            let mark = if selected { "[x] " } else { "[ ] " };
            let style = if form.focus == FormField::Indicators && i == form.indicator_cursor {
                theme.selected()
            } else {
                theme.muted()
            };
            [Span::styled(format!("{}{}", mark, kind.display_name()), style), Span::raw("  ")]
        })
        .collect();

    let row = |field: FormField, value: Vec<Span<'static>>| {
        let label_style = if form.focus == field {
            theme.selected()
        } else {
            theme.header()
        };
        let mut spans = vec![Span::styled(format!(" {:<13}", field.label()), label_style), Span::raw(" ")];
        spans.extend(value);
        Line::from(spans)
    };

    let lines = vec![
        row(FormField::Ticker, vec![Span::raw(format!("{}_", form.ticker))]),
        row(FormField::Days, vec![Span::raw(form.days.clone())]),
        row(FormField::Unit, vec![Span::raw(format!("◀ {} ▶", form.unit.label()))]),
        row(
            FormField::ChartType,
            vec![Span::raw(format!("◀ {} ▶", form.chart_type.label()))],
        ),
        row(FormField::Indicators, indicator_spans),
        row(FormField::Profile, vec![Span::raw(format!("◀ {} ▶", form.profile.label()))]),
    ];

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("📈 New Analysis")
            .border_style(theme.border()),
    );
    frame.render_widget(block, area);
}

fn render_progress(frame: &mut Frame, area: Rect, progress: Option<&ProgressUpdate>, theme: &Theme) {
    let (ratio, label) = match progress {
        Some(update) => (
            (update.percent / 100.0).clamp(0.0, 1.0),
            format!("{:.0}% {}", update.percent, update.stage.text()),
        ),
        None => (0.0, "Idle".to_string()),
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(theme.success())
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, area);
}

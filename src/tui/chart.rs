//! Terminal chart rendering.
//!
//! [`TerminalRenderer`] keeps the live chart specs, and [`ChartWidget`] draws
//! one of them on a braille canvas: candles as wicks and bodies, the area
//! type as a filled close line, and indicators as line overlays with gaps
//! where values are undefined.

use super::theme::hex_color;
use crate::error::Result;
use crate::services::{ChartRenderer, RenderHandle};
use crate::types::{ChartSpec, Decimal, Fill, OhlcPoint, SeriesData, SeriesSpec, ValuePoint};
use chrono::DateTime;
use rust_decimal::prelude::ToPrimitive;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine},
        Block, Borders, Paragraph, Widget,
    },
};
use std::collections::BTreeMap;
use tracing::debug;

const Y_LABEL_WIDTH: u16 = 11;

/// Chart renderer backed by the terminal.
#[derive(Default)]
pub struct TerminalRenderer {
    next_id: u64,
    live: BTreeMap<u64, ChartSpec>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently rendered live chart.
    pub fn current(&self) -> Option<&ChartSpec> {
        self.live.values().next_back()
    }

    pub fn live_instances(&self) -> usize {
        self.live.len()
    }
}

impl ChartRenderer for TerminalRenderer {
    fn render(&mut self, spec: ChartSpec) -> Result<RenderHandle> {
        self.next_id += 1;
        debug!("Terminal chart #{}: {}", self.next_id, spec.title);
        self.live.insert(self.next_id, spec);
        Ok(RenderHandle::new(self.next_id))
    }

    fn release(&mut self, handle: RenderHandle) {
        self.live.remove(&handle.id());
    }
}

/// Value range covered by a spec.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    x: [f64; 2],
    y: [f64; 2],
}

impl Bounds {
    fn of(spec: &ChartSpec) -> Option<Self> {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for series in &spec.series {
            match &series.data {
                SeriesData::Ohlc(candles) => {
                    for c in candles {
                        xs.push(c.x as f64);
                        ys.push(plot(c.low()));
                        ys.push(plot(c.high()));
                    }
                }
                SeriesData::Values(points) => {
                    for p in points {
                        if let Some(y) = p.y {
                            xs.push(p.x as f64);
                            ys.push(plot(y));
                        }
                    }
                }
            }
        }

        let min = |v: &[f64]| v.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = |v: &[f64]| v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if xs.is_empty() {
            return None;
        }

        let (x_min, x_max) = (min(&xs), max(&xs));
        let (y_min, y_max) = (min(&ys), max(&ys));
        // Flat series still need a visible band.
        let pad = ((y_max - y_min) * 0.05).max(0.5);

        Some(Self {
            x: [x_min, if x_max > x_min { x_max } else { x_min + 1.0 }],
            y: [y_min - pad, y_max + pad],
        })
    }
}

/// Widget drawing a [`ChartSpec`].
pub struct ChartWidget<'a> {
    spec: &'a ChartSpec,
}

impl<'a> ChartWidget<'a> {
    pub fn new(spec: &'a ChartSpec) -> Self {
        Self { spec }
    }
}

impl Widget for ChartWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(self.spec.title.as_str())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .style(Style::default().bg(hex_color(self.spec.chart.background)));
        let inner = block.inner(area);
        block.render(area, buf);

        let Some(bounds) = Bounds::of(self.spec) else {
            Paragraph::new("No chart data").render(inner, buf);
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(inner);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(Y_LABEL_WIDTH), Constraint::Min(0)])
            .split(rows[0]);

        self.render_y_labels(bounds, cols[0], buf);
        self.render_x_labels(bounds, Rect { x: cols[1].x, width: cols[1].width, ..rows[1] }, buf);

        let spec = self.spec;
        let slot_width = (bounds.x[1] - bounds.x[0]) / (cols[1].width.max(1) as f64);
        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds(bounds.x)
            .y_bounds(bounds.y)
            .paint(|ctx| {
                for series in &spec.series {
                    draw_series(ctx, spec, series, bounds, slot_width);
                }
            })
            .render(cols[1], buf);
    }
}

impl ChartWidget<'_> {
    fn render_y_labels(&self, bounds: Bounds, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let format = self.spec.y_axis.format.clone().unwrap_or_else(crate::types::ValueFormat::fixed2);
        let style = Style::default().fg(hex_color(self.spec.y_axis.label_color));
        let mid = (bounds.y[0] + bounds.y[1]) / 2.0;

        let mut lines = vec![Line::from(""); area.height as usize];
        let last = lines.len() - 1;
        lines[0] = Line::from(format.format(Some(bounds.y[1])));
        lines[last / 2] = Line::from(format.format(Some(mid)));
        lines[last] = Line::from(format.format(Some(bounds.y[0])));

        Paragraph::new(lines).style(style).render(area, buf);
    }

    fn render_x_labels(&self, bounds: Bounds, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(hex_color(self.spec.x_axis.label_color));
        let first = date_label(bounds.x[0]);
        let last = date_label(bounds.x[1]);
        let gap = (area.width as usize).saturating_sub(first.len() + last.len());
        let text = format!("{}{}{}", first, " ".repeat(gap), last);
        Paragraph::new(text).style(style).render(area, buf);
    }
}

fn date_label(ms: f64) -> String {
    DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn draw_series(ctx: &mut Context, spec: &ChartSpec, series: &SeriesSpec, bounds: Bounds, slot: f64) {
    let color = hex_color(series.style.color);
    match &series.data {
        SeriesData::Ohlc(candles) => {
            let up = hex_color(spec.candle_colors.upward);
            let down = hex_color(spec.candle_colors.downward);
            for candle in candles {
                draw_candle(ctx, candle, if candle.close() >= candle.open() { up } else { down }, slot);
            }
        }
        SeriesData::Values(points) => {
            if let Fill::Gradient { opacity_to, .. } = series.style.fill {
                let fill = dim(color, opacity_to.max(0.25));
                for p in points {
                    if let Some(y) = p.y {
                        ctx.draw(&CanvasLine {
                            x1: p.x as f64,
                            y1: bounds.y[0],
                            x2: p.x as f64,
                            y2: plot(y),
                            color: fill,
                        });
                    }
                }
            }
            draw_polyline(ctx, points, color, series.style.dash > 0);
        }
    }
}

fn draw_candle(ctx: &mut Context, candle: &OhlcPoint, color: Color, slot: f64) {
    let x = candle.x as f64;
    ctx.draw(&CanvasLine {
        x1: x,
        y1: plot(candle.low()),
        x2: x,
        y2: plot(candle.high()),
        color,
    });
    for offset in [-slot, slot] {
        ctx.draw(&CanvasLine {
            x1: x + offset,
            y1: plot(candle.open()),
            x2: x + offset,
            y2: plot(candle.close()),
            color,
        });
    }
}

fn plot(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Connect consecutive defined points; an undefined value breaks the line.
fn draw_polyline(ctx: &mut Context, points: &[ValuePoint], color: Color, dashed: bool) {
    for (i, pair) in points.windows(2).enumerate() {
        if dashed && i % 2 == 1 {
            continue;
        }
        if let (Some(a), Some(b)) = (pair[0].y, pair[1].y) {
            ctx.draw(&CanvasLine {
                x1: pair[0].x as f64,
                y1: plot(a),
                x2: pair[1].x as f64,
                y2: plot(b),
                color,
            });
        }
    }
}

fn dim(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => {
            let scale = |c: u8| (c as f32 * factor).round() as u8;
            Color::Rgb(scale(r), scale(g), scale(b))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{sanitize, ChartSpecBuilder, ChartView};
    use crate::types::{ChartType, RawChartData, RawPoint};
    use serde_json::json;

    fn sample_view(chart_type: ChartType) -> ChartView {
        let raw = RawChartData {
            candles: (0..20)
                .map(|i| RawPoint {
                    x: json!(1_700_000_000_000i64 + i * 86_400_000),
                    y: json!([10.0 + i as f64, 12.0 + i as f64, 9.0 + i as f64, 11.0 + i as f64]),
                })
                .collect(),
            vwap: Some(
                (0..20)
                    .map(|i| RawPoint {
                        x: json!(1_700_000_000_000i64 + i * 86_400_000),
                        y: if i < 3 { json!(null) } else { json!(10.5 + i as f64) },
                    })
                    .collect(),
            ),
            ..Default::default()
        };
        ChartView::new(sanitize(&raw), "PETR4", chart_type, ChartSpecBuilder::default())
    }

    #[test]
    fn test_renderer_keeps_single_live_chart() {
        let mut renderer = TerminalRenderer::new();
        let mut view = sample_view(ChartType::Candlestick);

        view.render(&mut renderer).unwrap();
        view.switch_type(ChartType::AreaOfClose, &mut renderer).unwrap();

        assert_eq!(renderer.live_instances(), 1);
        assert_eq!(
            renderer.current().map(|s| s.chart.chart_type),
            Some(ChartType::AreaOfClose)
        );
    }

    #[test]
    fn test_widget_renders_both_types() {
        for chart_type in ChartType::all() {
            let spec = sample_view(chart_type).spec();
            let area = Rect::new(0, 0, 80, 20);
            let mut buf = Buffer::empty(area);
            ChartWidget::new(&spec).render(area, &mut buf);
            // Should render without panic
        }
    }

    #[test]
    fn test_widget_renders_empty_spec() {
        let spec = ChartView::new(
            Default::default(),
            "EMPTY3",
            ChartType::Candlestick,
            ChartSpecBuilder::default(),
        )
        .spec();
        assert!(Bounds::of(&spec).is_none());

        let area = Rect::new(0, 0, 40, 10);
        let mut buf = Buffer::empty(area);
        ChartWidget::new(&spec).render(area, &mut buf);
    }

    #[test]
    fn test_bounds_cover_wicks() {
        let spec = sample_view(ChartType::Candlestick).spec();
        let bounds = Bounds::of(&spec).unwrap();
        assert!(bounds.y[0] < 9.0);
        assert!(bounds.y[1] > 31.0);
    }

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(1_700_000_000_000.0), "2023-11-14");
    }
}

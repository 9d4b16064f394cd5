//! Chart spec builder.
//!
//! [`ChartSpecBuilder`] is a pure function of its inputs: the same sanitized
//! data, chart type and ticker always produce the same [`ChartSpec`].
//! [`ChartView`] owns the sanitized data of one on-screen chart together with
//! its single render handle, so switching chart type re-derives from the
//! original candles and never leaks a previous render instance.

use super::render::{ChartRenderer, RenderHandle};
use super::sanitizer::SanitizedChartData;
use crate::error::Result;
use crate::types::{
    AxisKind, AxisSpec, CandleColors, ChartOptions, ChartSpec, ChartType, Fill, OhlcPoint,
    SeriesData, SeriesKind, SeriesSpec, SeriesStyle, TooltipSpec, ValueFormat, ValuePoint,
    AREA_COLOR, AXIS_LABEL_COLOR, CHART_BACKGROUND, GAIN_COLOR, LOSS_COLOR,
};
use tracing::debug;

/// Name of the primary price series.
pub const PRICE_SERIES_NAME: &str = "Price";

const DEFAULT_HEIGHT: u32 = 500;

/// Style and candle transform of the primary series for one chart type.
pub struct PrimaryStyle {
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub transform: fn(&[OhlcPoint]) -> SeriesData,
}

static PRIMARY_STYLES: [PrimaryStyle; 2] = [
    PrimaryStyle {
        kind: SeriesKind::Candlestick,
        style: SeriesStyle {
            color: GAIN_COLOR,
            stroke_width: 1,
            dash: 0,
            fill: Fill::Solid,
        },
        transform: ohlc_series,
    },
    PrimaryStyle {
        kind: SeriesKind::Area,
        style: SeriesStyle {
            color: AREA_COLOR,
            stroke_width: 2,
            dash: 0,
            fill: Fill::Gradient {
                opacity_from: 0.5,
                opacity_to: 0.05,
            },
        },
        transform: close_series,
    },
];

impl PrimaryStyle {
    pub fn for_chart_type(chart_type: ChartType) -> &'static PrimaryStyle {
        match chart_type {
            ChartType::Candlestick => &PRIMARY_STYLES[0],
            ChartType::AreaOfClose => &PRIMARY_STYLES[1],
        }
    }
}

fn ohlc_series(candles: &[OhlcPoint]) -> SeriesData {
    SeriesData::Ohlc(candles.to_vec())
}

/// Lossy projection of each candle onto its close.
fn close_series(candles: &[OhlcPoint]) -> SeriesData {
    SeriesData::Values(
        candles
            .iter()
            .map(|c| ValuePoint {
                x: c.x,
                y: Some(c.close()),
            })
            .collect(),
    )
}

/// Builds chart specs with a fixed formatting policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpecBuilder {
    currency_prefix: String,
    height: u32,
}

impl ChartSpecBuilder {
    pub fn new(currency_prefix: impl Into<String>) -> Self {
        Self {
            currency_prefix: currency_prefix.into(),
            height: DEFAULT_HEIGHT,
        }
    }

    /// Build the spec for one render.
    pub fn build(&self, data: &SanitizedChartData, chart_type: ChartType, ticker: &str) -> ChartSpec {
        let primary = PrimaryStyle::for_chart_type(chart_type);

        let mut series = Vec::with_capacity(1 + data.indicators.len());
        series.push(SeriesSpec {
            name: PRICE_SERIES_NAME.to_string(),
            kind: primary.kind,
            style: primary.style,
            data: (primary.transform)(&data.candles),
        });

        series.extend(data.renderable_indicators().map(|indicator| SeriesSpec {
            name: indicator.kind.display_name().to_string(),
            kind: SeriesKind::Line,
            style: indicator.kind.style(),
            data: SeriesData::Values(indicator.points.clone()),
        }));

        ChartSpec {
            title: format!("{} - Quantitative Analysis", ticker),
            chart: ChartOptions {
                chart_type,
                height: self.height,
                background: CHART_BACKGROUND,
                dark: true,
            },
            series,
            x_axis: AxisSpec {
                kind: AxisKind::Datetime,
                label_color: AXIS_LABEL_COLOR,
                format: None,
            },
            y_axis: AxisSpec {
                kind: AxisKind::Numeric,
                label_color: AXIS_LABEL_COLOR,
                format: Some(ValueFormat::fixed2()),
            },
            tooltip: TooltipSpec {
                shared: true,
                format: ValueFormat::currency(&self.currency_prefix),
            },
            candle_colors: CandleColors {
                upward: GAIN_COLOR,
                downward: LOSS_COLOR,
            },
        }
    }
}

impl Default for ChartSpecBuilder {
    fn default() -> Self {
        Self::new("R$ ")
    }
}

/// One on-screen chart: its source data, current type and live render.
pub struct ChartView {
    data: SanitizedChartData,
    ticker: String,
    chart_type: ChartType,
    builder: ChartSpecBuilder,
    handle: Option<RenderHandle>,
}

impl ChartView {
    pub fn new(
        data: SanitizedChartData,
        ticker: impl Into<String>,
        chart_type: ChartType,
        builder: ChartSpecBuilder,
    ) -> Self {
        Self {
            data,
            ticker: ticker.into(),
            chart_type,
            builder,
            handle: None,
        }
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    /// The preserved source data, untouched by chart type switches.
    pub fn data(&self) -> &SanitizedChartData {
        &self.data
    }

    pub fn is_rendered(&self) -> bool {
        self.handle.is_some()
    }

    /// Spec for the current chart type.
    pub fn spec(&self) -> ChartSpec {
        self.builder.build(&self.data, self.chart_type, &self.ticker)
    }

    /// Release any previous render, then render the current spec.
    pub fn render<R: ChartRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<()> {
        self.release(renderer);
        let handle = renderer.render(self.spec())?;
        debug!(
            "Rendered {} chart for {} as instance #{}",
            self.chart_type.label(),
            self.ticker,
            handle.id()
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Switch chart type and re-render from the original candles.
    pub fn switch_type<R: ChartRenderer + ?Sized>(
        &mut self,
        chart_type: ChartType,
        renderer: &mut R,
    ) -> Result<()> {
        self.chart_type = chart_type;
        self.render(renderer)
    }

    /// Render again with the same type, e.g. after the viewport changed.
    pub fn rerender<R: ChartRenderer + ?Sized>(&mut self, renderer: &mut R) -> Result<()> {
        if !self.is_rendered() {
            return Ok(());
        }
        self.render(renderer)
    }

    /// Tear down the live render, if any.
    pub fn release<R: ChartRenderer + ?Sized>(&mut self, renderer: &mut R) {
        if let Some(handle) = self.handle.take() {
            renderer.release(handle);
        }
    }
}

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use rust_decimal::Decimal;

/// Color for rising candles and positive figures, shared by every view.
pub const GAIN_COLOR: &str = "#00E396";
/// Color for falling candles and negative figures.
pub const LOSS_COLOR: &str = "#FF4560";
/// Primary line color for the area-of-close chart.
pub const AREA_COLOR: &str = "#2E93FA";
/// Chart background.
pub const CHART_BACKGROUND: &str = "#1F2937";
/// Axis label color.
pub const AXIS_LABEL_COLOR: &str = "#9CA3AF";

/// Round a price to two decimal places, half away from zero.
/// Returns None for NaN, infinities and values out of range.
pub fn round2(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Sanitized OHLC candle: `y` is `[open, high, low, close]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OhlcPoint {
    /// Unix timestamp (milliseconds).
    pub x: i64,
    pub y: [Decimal; 4],
}

impl OhlcPoint {
    pub fn open(&self) -> Decimal {
        self.y[0]
    }

    pub fn high(&self) -> Decimal {
        self.y[1]
    }

    pub fn low(&self) -> Decimal {
        self.y[2]
    }

    pub fn close(&self) -> Decimal {
        self.y[3]
    }
}

/// Single-value point. `None` means the value is undefined at `x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePoint {
    /// Unix timestamp (milliseconds).
    pub x: i64,
    pub y: Option<Decimal>,
}

/// How the primary price series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChartType {
    #[default]
    #[serde(rename = "candlestick")]
    Candlestick,
    #[serde(rename = "area")]
    AreaOfClose,
}

impl ChartType {
    pub fn all() -> [Self; 2] {
        [ChartType::Candlestick, ChartType::AreaOfClose]
    }

    /// Get display label for this chart type.
    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Candlestick => "Candlestick",
            ChartType::AreaOfClose => "Area (close)",
        }
    }

    /// The other chart type.
    pub fn toggled(&self) -> Self {
        match self {
            ChartType::Candlestick => ChartType::AreaOfClose,
            ChartType::AreaOfClose => ChartType::Candlestick,
        }
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "candlestick" | "candle" => Ok(ChartType::Candlestick),
            "area" | "line" => Ok(ChartType::AreaOfClose),
            other => Err(format!("unknown chart type: {}", other)),
        }
    }
}

/// Technical indicator overlays the backend can supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Vwap,
    #[serde(rename = "sma_14")]
    Sma14,
    #[serde(rename = "sma_50")]
    Sma50,
    #[serde(rename = "bb_upper")]
    BollingerUpper,
    #[serde(rename = "bb_lower")]
    BollingerLower,
}

impl IndicatorKind {
    /// All indicators, in overlay order.
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::Vwap,
        IndicatorKind::Sma14,
        IndicatorKind::Sma50,
        IndicatorKind::BollingerUpper,
        IndicatorKind::BollingerLower,
    ];

    /// Key used in the analyze payload and query string.
    pub fn key(&self) -> &'static str {
        match self {
            IndicatorKind::Vwap => "vwap",
            IndicatorKind::Sma14 => "sma_14",
            IndicatorKind::Sma50 => "sma_50",
            IndicatorKind::BollingerUpper => "bb_upper",
            IndicatorKind::BollingerLower => "bb_lower",
        }
    }

    /// Series name shown in legends and tooltips.
    pub fn display_name(&self) -> &'static str {
        match self {
            IndicatorKind::Vwap => "VWAP",
            IndicatorKind::Sma14 => "SMA 14",
            IndicatorKind::Sma50 => "SMA 50",
            IndicatorKind::BollingerUpper => "BB Upper",
            IndicatorKind::BollingerLower => "BB Lower",
        }
    }

    /// Overlay line style. VWAP is the dashed reference line.
    pub fn style(&self) -> SeriesStyle {
        let (color, stroke_width, dash) = match self {
            IndicatorKind::Vwap => ("#FEB019", 2, 5),
            IndicatorKind::Sma14 => ("#EC4899", 2, 0),
            IndicatorKind::Sma50 => ("#3B82F6", 2, 0),
            IndicatorKind::BollingerUpper => ("#775DD0", 1, 0),
            IndicatorKind::BollingerLower => ("#775DD0", 1, 0),
        };
        SeriesStyle {
            color,
            stroke_width,
            dash,
            fill: Fill::Solid,
        }
    }
}

impl FromStr for IndicatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        IndicatorKind::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted || kind.display_name().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown indicator: {}", s))
    }
}

/// Series rendering kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Candlestick,
    Area,
    Line,
}

/// Series fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Fill {
    Solid,
    Gradient { opacity_from: f32, opacity_to: f32 },
}

/// Visual style of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStyle {
    pub color: &'static str,
    pub stroke_width: u8,
    /// Dash length; 0 is a solid stroke.
    pub dash: u8,
    pub fill: Fill,
}

/// Points of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesData {
    Ohlc(Vec<OhlcPoint>),
    Values(Vec<ValuePoint>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Ohlc(points) => points.len(),
            SeriesData::Values(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One entry in the chart's series list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSpec {
    pub name: String,
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub data: SeriesData,
}

/// Formatting policy for values shown on axes and tooltips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueFormat {
    pub prefix: String,
    pub decimals: u8,
    /// Shown instead of a number when the value is absent.
    pub placeholder: String,
}

impl ValueFormat {
    /// Plain two-decimal format.
    pub fn fixed2() -> Self {
        Self {
            prefix: String::new(),
            decimals: 2,
            placeholder: "--".to_string(),
        }
    }

    /// Two-decimal format with a currency prefix.
    pub fn currency(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Self::fixed2()
        }
    }

    pub fn format(&self, value: Option<f64>) -> String {
        match value.filter(|v| v.is_finite()) {
            Some(v) => format!("{}{:.*}", self.prefix, self.decimals as usize, v),
            None => self.placeholder.clone(),
        }
    }

    pub fn format_decimal(&self, value: Option<Decimal>) -> String {
        match value {
            Some(v) => format!("{}{:.*}", self.prefix, self.decimals as usize, v),
            None => self.placeholder.clone(),
        }
    }
}

/// Axis scale type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Datetime,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub kind: AxisKind,
    pub label_color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ValueFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipSpec {
    pub shared: bool,
    pub format: ValueFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandleColors {
    pub upward: &'static str,
    pub downward: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub chart_type: ChartType,
    pub height: u32,
    pub background: &'static str,
    pub dark: bool,
}

/// Declarative chart configuration consumed by a render capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub chart: ChartOptions,
    pub series: Vec<SeriesSpec>,
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    pub tooltip: TooltipSpec,
    pub candle_colors: CandleColors,
}

impl ChartSpec {
    /// The price series (always first).
    pub fn primary(&self) -> Option<&SeriesSpec> {
        self.series.first()
    }

    /// Find a series by name.
    pub fn series_named(&self, name: &str) -> Option<&SeriesSpec> {
        self.series.iter().find(|s| s.name == name)
    }
}

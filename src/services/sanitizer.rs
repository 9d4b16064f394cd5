//! Chart data sanitization.
//!
//! Turns the loosely typed chart bundle of an analyze response into
//! render-ready series: OHLC quadruples and indicator values rounded to two
//! decimals, undefined indicator values kept as explicit gaps, and malformed
//! points dropped one at a time.

use crate::types::{round2, IndicatorKind, OhlcPoint, RawChartData, RawPoint, ValuePoint};
use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use tracing::debug;

/// Sanitized points of one indicator the backend supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub points: Vec<ValuePoint>,
}

impl IndicatorSeries {
    /// Only non-empty series are drawn.
    pub fn is_renderable(&self) -> bool {
        !self.points.is_empty()
    }
}

/// Render-ready chart data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizedChartData {
    pub candles: Vec<OhlcPoint>,
    /// One entry per indicator present in the payload, in overlay order.
    pub indicators: Vec<IndicatorSeries>,
}

impl SanitizedChartData {
    /// None when the backend never supplied the indicator; Some (possibly
    /// empty) otherwise.
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&IndicatorSeries> {
        self.indicators.iter().find(|s| s.kind == kind)
    }

    /// Indicators that should produce an overlay.
    pub fn renderable_indicators(&self) -> impl Iterator<Item = &IndicatorSeries> {
        self.indicators.iter().filter(|s| s.is_renderable())
    }
}

/// Sanitize a full chart bundle.
pub fn sanitize(raw: &RawChartData) -> SanitizedChartData {
    let candles = sanitize_candles(&raw.candles);

    let indicators = IndicatorKind::ALL
        .into_iter()
        .filter_map(|kind| {
            raw.indicator(kind).map(|points| IndicatorSeries {
                kind,
                points: sanitize_indicator(kind, points),
            })
        })
        .collect();

    SanitizedChartData {
        candles,
        indicators,
    }
}

/// Sanitize candles. Candles with malformed values or whose raw values break
/// `low <= open, close <= high` are dropped, not repaired.
pub fn sanitize_candles(raw: &[RawPoint]) -> Vec<OhlcPoint> {
    let candles: Vec<OhlcPoint> = raw.iter().filter_map(sanitize_candle).collect();

    let dropped = raw.len() - candles.len();
    if dropped > 0 {
        debug!("Dropped {} of {} candles during sanitization", dropped, raw.len());
    }

    candles
}

fn sanitize_candle(point: &RawPoint) -> Option<OhlcPoint> {
    let x = parse_timestamp(&point.x)?;
    let values = point.y.as_array()?;
    if values.len() != 4 {
        return None;
    }

    let mut ohlc = [0.0f64; 4];
    for (slot, value) in ohlc.iter_mut().zip(values) {
        *slot = finite_price(value)?;
    }

    let [open, high, low, close] = ohlc;
    if high < open.max(close).max(low) || low > open.min(close).min(high) {
        return None;
    }

    // Rounding is monotone, so the ordering checked above still holds.
    Some(OhlcPoint {
        x,
        y: [
            round2(open)?,
            round2(high)?,
            round2(low)?,
            round2(close)?,
        ],
    })
}

/// Sanitize one indicator series. `null` becomes an explicit gap; anything
/// that is neither null nor a finite number drops that point only.
pub fn sanitize_indicator(kind: IndicatorKind, raw: &[RawPoint]) -> Vec<ValuePoint> {
    let points: Vec<ValuePoint> = raw
        .iter()
        .filter_map(|point| {
            let x = parse_timestamp(&point.x)?;
            let y = match &point.y {
                Value::Null => None,
                Value::Number(n) => Some(n.as_f64().and_then(round2)?),
                _ => return None,
            };
            Some(ValuePoint { x, y })
        })
        .collect();

    let dropped = raw.len() - points.len();
    if dropped > 0 {
        debug!(
            "Dropped {} of {} {} points during sanitization",
            dropped,
            raw.len(),
            kind.display_name()
        );
    }

    points
}

/// Parse a point timestamp into epoch milliseconds.
///
/// Accepts integer or float milliseconds, numeric strings, RFC 3339
/// timestamps and `YYYY-MM-DD` dates (UTC midnight).
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                return Some(ms);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

fn finite_price(value: &Value) -> Option<f64> {
    value.as_f64().filter(|v| v.is_finite() && *v >= 0.0)
}

use super::chart::IndicatorKind;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loosely typed `{x, y}` point as sent by the backend.
///
/// Values are kept as raw JSON so that malformed points survive
/// deserialization and can be dropped one at a time during sanitization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub x: serde_json::Value,
    #[serde(default)]
    pub y: serde_json::Value,
}

/// Chart bundle of an analyze response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChartData {
    #[serde(default)]
    pub candles: Vec<RawPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vwap: Option<Vec<RawPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_14: Option<Vec<RawPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sma_50: Option<Vec<RawPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_upper: Option<Vec<RawPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bb_lower: Option<Vec<RawPoint>>,
}

impl RawChartData {
    /// Raw points for an indicator, or None when the backend did not supply it.
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&[RawPoint]> {
        let series = match kind {
            IndicatorKind::Vwap => &self.vwap,
            IndicatorKind::Sma14 => &self.sma_14,
            IndicatorKind::Sma50 => &self.sma_50,
            IndicatorKind::BollingerUpper => &self.bb_upper,
            IndicatorKind::BollingerLower => &self.bb_lower,
        };
        series.as_deref()
    }
}

/// Unit of the prediction horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HorizonUnit {
    #[default]
    #[serde(rename = "D")]
    Days,
    #[serde(rename = "W")]
    Weeks,
    #[serde(rename = "M")]
    Months,
    #[serde(rename = "Y")]
    Years,
}

impl HorizonUnit {
    pub fn all() -> [Self; 4] {
        [
            HorizonUnit::Days,
            HorizonUnit::Weeks,
            HorizonUnit::Months,
            HorizonUnit::Years,
        ]
    }

    /// Code sent as the `timeframe` query parameter.
    pub fn code(&self) -> &'static str {
        match self {
            HorizonUnit::Days => "D",
            HorizonUnit::Weeks => "W",
            HorizonUnit::Months => "M",
            HorizonUnit::Years => "Y",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HorizonUnit::Days => "days",
            HorizonUnit::Weeks => "weeks",
            HorizonUnit::Months => "months",
            HorizonUnit::Years => "years",
        }
    }

    /// Next unit, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            HorizonUnit::Days => HorizonUnit::Weeks,
            HorizonUnit::Weeks => HorizonUnit::Months,
            HorizonUnit::Months => HorizonUnit::Years,
            HorizonUnit::Years => HorizonUnit::Days,
        }
    }
}

impl FromStr for HorizonUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "D" | "DAYS" => Ok(HorizonUnit::Days),
            "W" | "WEEKS" => Ok(HorizonUnit::Weeks),
            "M" | "MONTHS" => Ok(HorizonUnit::Months),
            "Y" | "YEARS" => Ok(HorizonUnit::Years),
            other => Err(format!("unknown horizon unit: {}", other)),
        }
    }
}

/// Forward-looking distance the prediction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub count: u32,
    pub unit: HorizonUnit,
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.count, self.unit.label())
    }
}

/// Risk appetite passed to the analysis model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskProfile {
    pub fn code(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "conservative",
            RiskProfile::Moderate => "moderate",
            RiskProfile::Aggressive => "aggressive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskProfile::Conservative => "Conservative",
            RiskProfile::Moderate => "Moderate",
            RiskProfile::Aggressive => "Aggressive",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            RiskProfile::Conservative => RiskProfile::Moderate,
            RiskProfile::Moderate => RiskProfile::Aggressive,
            RiskProfile::Aggressive => RiskProfile::Conservative,
        }
    }
}

impl FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskProfile::Conservative),
            "moderate" => Ok(RiskProfile::Moderate),
            "aggressive" => Ok(RiskProfile::Aggressive),
            other => Err(format!("unknown risk profile: {}", other)),
        }
    }
}

/// Parameters of one analyze request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisParams {
    /// Horizon length.
    pub days: u32,
    pub timeframe: HorizonUnit,
    pub indicators: Vec<IndicatorKind>,
    pub profile: RiskProfile,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            days: 30,
            timeframe: HorizonUnit::Days,
            indicators: vec![
                IndicatorKind::Vwap,
                IndicatorKind::Sma14,
                IndicatorKind::Sma50,
            ],
            profile: RiskProfile::Moderate,
        }
    }
}

impl AnalysisParams {
    /// Flat query parameter set; `indicators` repeats once per selection.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("days", self.days.to_string()),
            ("timeframe", self.timeframe.code().to_string()),
        ];
        pairs.extend(
            self.indicators
                .iter()
                .map(|kind| ("indicators", kind.key().to_string())),
        );
        pairs.push(("profile", self.profile.code().to_string()));
        pairs
    }

    pub fn horizon(&self) -> Horizon {
        Horizon {
            count: self.days,
            unit: self.timeframe,
        }
    }
}

/// Categorical trade recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// Classify a backend display string such as "COMPRA 🚀" or "SELL".
    pub fn classify(label: &str) -> Self {
        let upper = label.to_uppercase();
        if upper.contains("COMPRA") || upper.contains("BUY") {
            Signal::Buy
        } else if upper.contains("VENDA") || upper.contains("SELL") {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::Hold => "HOLD",
        }
    }
}

/// Accepts `0.82` as well as `"82.0%"`; percent strings become fractions.
fn deserialize_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawConfidence {
        Number(f64),
        Text(String),
    }

    match RawConfidence::deserialize(deserializer)? {
        RawConfidence::Number(value) => Ok(value),
        RawConfidence::Text(text) => {
            let trimmed = text.trim();
            let (number, percent) = match trimmed.strip_suffix('%') {
                Some(n) => (n.trim(), true),
                None => (trimmed, false),
            };
            let value: f64 = number
                .replace(',', ".")
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid confidence: {}", text)))?;
            Ok(if percent { value / 100.0 } else { value })
        }
    }
}

/// Body of a successful analyze call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub ticker: String,
    pub signal: String,
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    pub current_price: f64,
    pub predicted_price: f64,
    pub variation_pct: f64,
    #[serde(default)]
    pub chart_data: RawChartData,
}

/// Outcome of one orchestrator run, as held in memory or in the state slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    /// Display string from the backend; see [`AnalysisResult::signal_kind`].
    pub signal: String,
    #[serde(deserialize_with = "deserialize_confidence")]
    pub confidence: f64,
    pub current_price: f64,
    pub predicted_price: f64,
    pub variation_pct: f64,
    pub horizon: Horizon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<RiskProfile>,
    pub chart_data: RawChartData,
}

impl AnalysisResult {
    /// Attach request context to a raw analyze response.
    pub fn from_response(response: AnalyzeResponse, params: &AnalysisParams) -> Self {
        Self {
            ticker: response.ticker,
            signal: response.signal,
            confidence: response.confidence,
            current_price: response.current_price,
            predicted_price: response.predicted_price,
            variation_pct: response.variation_pct,
            horizon: params.horizon(),
            profile: Some(params.profile),
            chart_data: response.chart_data,
        }
    }

    pub fn signal_kind(&self) -> Signal {
        Signal::classify(&self.signal)
    }
}

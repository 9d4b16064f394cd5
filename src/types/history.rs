//! Prediction history wire types.

use serde::{Deserialize, Serialize};

/// Accuracy of the audited predictions for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStat {
    pub ticker: String,
    #[serde(default)]
    pub total_predictions: u64,
    /// Percent of predictions that hit, 0 - 100.
    #[serde(default)]
    pub accuracy: f64,
    /// Mean absolute error, in percent.
    #[serde(default)]
    pub avg_error: f64,
}

/// One recorded analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub date: String,
    pub target_date: String,
    pub ticker: String,
    /// Comma-separated indicator names; absent for the default set.
    #[serde(default)]
    pub indicators: Option<String>,
    #[serde(default)]
    pub predicted: Option<f64>,
    /// Closing price on the target date, once it is known.
    #[serde(default)]
    pub real: Option<f64>,
    /// Audit verdict text, e.g. "✅ Acertou".
    #[serde(default)]
    pub result: Option<String>,
}

/// Audit verdict of a logged prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    Hit,
    Miss,
    Pending,
}

impl PredictionOutcome {
    pub fn from_verdict(verdict: Option<&str>) -> Self {
        match verdict {
            Some(v) if v.contains('❌') => Self::Miss,
            Some(v) if v.contains('✅') => Self::Hit,
            _ => Self::Pending,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Hit => "✅",
            Self::Miss => "❌",
            Self::Pending => "⏳",
        }
    }
}

impl PredictionLogEntry {
    pub fn outcome(&self) -> PredictionOutcome {
        PredictionOutcome::from_verdict(self.result.as_deref())
    }
}

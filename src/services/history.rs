//! Prediction history: accuracy ranking and the detailed analysis log.
//!
//! Both sections are fetched and formatted independently, so a failure in
//! one still leaves the other on screen.

use super::presenter::Tone;
use crate::error::Result;
use crate::sources::AnalysisBackend;
use crate::types::{round2, AccuracyStat, PredictionLogEntry, PredictionOutcome};
use tracing::{info, warn};

pub const NO_STATS: &str =
    "No audited predictions yet. A prediction is checked once its target date has passed.";
pub const NO_LOG: &str = "No analyses recorded yet. Run one from the form to start.";
pub const DEFAULT_INDICATORS: &str = "Padrão";
pub const MISSING_PRICE: &str = "--";

const GOOD_ACCURACY: f64 = 60.0;
const FAIR_ACCURACY: f64 = 50.0;

/// Tone of an accuracy percentage.
pub fn accuracy_tone(accuracy: f64) -> Tone {
    if accuracy >= GOOD_ACCURACY {
        Tone::Gain
    } else if accuracy >= FAIR_ACCURACY {
        Tone::Caution
    } else {
        Tone::Loss
    }
}

/// What one history section shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Rows(Vec<T>),
    Empty(&'static str),
    Failed(String),
}

impl<T> Section<T> {
    fn from_rows(rows: Vec<T>, empty: &'static str) -> Self {
        if rows.is_empty() {
            Self::Empty(empty)
        } else {
            Self::Rows(rows)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatRow {
    pub ticker: String,
    pub total: String,
    pub accuracy: String,
    pub accuracy_tone: Tone,
    pub avg_error: String,
}

impl StatRow {
    pub fn from_stat(stat: &AccuracyStat) -> Self {
        Self {
            ticker: stat.ticker.clone(),
            total: stat.total_predictions.to_string(),
            accuracy: format!("{:.1}%", stat.accuracy),
            accuracy_tone: accuracy_tone(stat.accuracy),
            avg_error: format!("± {:.2}%", stat.avg_error),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub date: String,
    pub target_date: String,
    pub ticker: String,
    pub indicators: Vec<String>,
    pub predicted: String,
    pub real: String,
    pub outcome: PredictionOutcome,
}

impl LogRow {
    pub fn from_entry(entry: &PredictionLogEntry, currency_prefix: &str) -> Self {
        let indicators = entry
            .indicators
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_INDICATORS)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            date: entry.date.clone(),
            target_date: entry.target_date.clone(),
            ticker: entry.ticker.clone(),
            indicators,
            predicted: price(entry.predicted, currency_prefix),
            real: price(entry.real, currency_prefix),
            outcome: entry.outcome(),
        }
    }
}

/// A zero price means the backend had nothing to report.
fn price(value: Option<f64>, currency_prefix: &str) -> String {
    value
        .and_then(round2)
        .filter(|d| !d.is_zero())
        .map(|d| format!("{}{:.2}", currency_prefix, d))
        .unwrap_or_else(|| MISSING_PRICE.to_string())
}

/// Both history sections, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub stats: Section<StatRow>,
    pub log: Section<LogRow>,
}

impl HistoryView {
    pub fn from_parts(
        stats: Result<Vec<AccuracyStat>>,
        log: Result<Vec<PredictionLogEntry>>,
        currency_prefix: &str,
    ) -> Self {
        let stats = match stats {
            Ok(stats) => Section::from_rows(stats.iter().map(StatRow::from_stat).collect(), NO_STATS),
            Err(e) => {
                warn!("Could not load accuracy stats: {}", e);
                Section::Failed(e.user_message())
            }
        };
        let log = match log {
            Ok(entries) => Section::from_rows(
                entries
                    .iter()
                    .map(|entry| LogRow::from_entry(entry, currency_prefix))
                    .collect(),
                NO_LOG,
            ),
            Err(e) => {
                warn!("Could not load prediction log: {}", e);
                Section::Failed(e.user_message())
            }
        };
        Self { stats, log }
    }
}

/// Fetch the ranking, then the log.
pub async fn load_history(backend: &dyn AnalysisBackend, currency_prefix: &str) -> HistoryView {
    let stats = backend.history_stats().await;
    let log = backend.history_log().await;
    if let (Ok(stats), Ok(log)) = (&stats, &log) {
        info!("Loaded history: {} tickers, {} analyses", stats.len(), log.len());
    }
    HistoryView::from_parts(stats, log, currency_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn entry(indicators: Option<&str>, predicted: Option<f64>, real: Option<f64>) -> PredictionLogEntry {
        PredictionLogEntry {
            date: "2024-05-02".to_string(),
            target_date: "2024-06-01".to_string(),
            ticker: "PETR4".to_string(),
            indicators: indicators.map(str::to_string),
            predicted,
            real,
            result: None,
        }
    }

    #[test]
    fn test_accuracy_tone_thresholds() {
        assert_eq!(accuracy_tone(72.0), Tone::Gain);
        assert_eq!(accuracy_tone(60.0), Tone::Gain);
        assert_eq!(accuracy_tone(59.9), Tone::Caution);
        assert_eq!(accuracy_tone(50.0), Tone::Caution);
        assert_eq!(accuracy_tone(49.9), Tone::Loss);
        assert_eq!(accuracy_tone(f64::NAN), Tone::Loss);
    }

    #[test]
    fn test_stat_row_format() {
        let row = StatRow::from_stat(&AccuracyStat {
            ticker: "VALE3".to_string(),
            total_predictions: 8,
            accuracy: 62.5,
            avg_error: 1.8,
        });
        assert_eq!(row.total, "8");
        assert_eq!(row.accuracy, "62.5%");
        assert_eq!(row.avg_error, "± 1.80%");
        assert_eq!(row.accuracy_tone, Tone::Gain);
    }

    #[test]
    fn test_indicators_split_and_default() {
        let row = LogRow::from_entry(&entry(Some("VWAP, SMA 14"), None, None), "R$ ");
        assert_eq!(row.indicators, vec!["VWAP", "SMA 14"]);

        let row = LogRow::from_entry(&entry(None, None, None), "R$ ");
        assert_eq!(row.indicators, vec![DEFAULT_INDICATORS]);

        let row = LogRow::from_entry(&entry(Some(""), None, None), "R$ ");
        assert_eq!(row.indicators, vec![DEFAULT_INDICATORS]);
    }

    #[test]
    fn test_missing_prices_use_placeholder() {
        let row = LogRow::from_entry(&entry(None, Some(41.2), None), "R$ ");
        assert_eq!(row.predicted, "R$ 41.20");
        assert_eq!(row.real, MISSING_PRICE);
        assert_eq!(row.outcome, PredictionOutcome::Pending);

        let row = LogRow::from_entry(&entry(None, Some(0.0), Some(f64::NAN)), "R$ ");
        assert_eq!(row.predicted, MISSING_PRICE);
        assert_eq!(row.real, MISSING_PRICE);
    }

    #[test]
    fn test_sections_fail_independently() {
        let view = HistoryView::from_parts(
            Err(AppError::Network("connection refused".to_string())),
            Ok(Vec::new()),
            "R$ ",
        );
        assert!(matches!(view.stats, Section::Failed(ref m) if m.contains("analysis server")));
        assert_eq!(view.log, Section::Empty(NO_LOG));

        let view = HistoryView::from_parts(Ok(Vec::new()), Ok(vec![entry(None, None, None)]), "R$ ");
        assert_eq!(view.stats, Section::Empty(NO_STATS));
        assert!(matches!(view.log, Section::Rows(ref rows) if rows.len() == 1));
    }
}

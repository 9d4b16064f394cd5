//! Analysis backend client.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{AccuracyStat, AnalysisParams, AnalyzeResponse, PredictionLogEntry, Quote};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Boxed future returned by [`AnalysisBackend`] calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Remote operations the orchestrator depends on.
pub trait AnalysisBackend: Send + Sync {
    /// Ask the backend to refresh its price history for `ticker`.
    fn sync<'a>(&'a self, ticker: &'a str) -> BackendFuture<'a, ()>;

    /// Run the analysis for `ticker`.
    fn analyze<'a>(
        &'a self,
        ticker: &'a str,
        params: &'a AnalysisParams,
    ) -> BackendFuture<'a, AnalyzeResponse>;

    /// Latest price and 52-week statistics.
    fn quote<'a>(&'a self, ticker: &'a str) -> BackendFuture<'a, Quote>;

    /// Per-ticker accuracy of the audited predictions.
    fn history_stats(&self) -> BackendFuture<'_, Vec<AccuracyStat>>;

    /// Every recorded analysis, newest first.
    fn history_log(&self) -> BackendFuture<'_, Vec<PredictionLogEntry>>;
}

/// HTTP client for the analysis backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("quantdash/0.1")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn sync_ticker(&self, ticker: &str) -> Result<()> {
        let url = format!("{}/sync/{}", self.base_url, ticker);
        debug!("POST {}", url);

        let response = self.client.post(&url).send().await.map_err(network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network)?;

        if !status.is_success() {
            let detail = rejection_detail(&body).unwrap_or_else(|| status_text(status));
            warn!("Sync of {} rejected ({}): {}", ticker, status.as_u16(), detail);
            return Err(AppError::ServerRejection {
                status: status.as_u16(),
                detail,
            });
        }

        info!("Synced price history for {}", ticker);
        Ok(())
    }

    async fn analyze_ticker(&self, ticker: &str, params: &AnalysisParams) -> Result<AnalyzeResponse> {
        let url = format!("{}/analyze/{}", self.base_url, ticker);
        debug!("GET {} with {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&params.query_pairs())
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network)?;

        parse_analyze_body(status, &body)
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<Quote> {
        let url = format!("{}/quote/{}", self.base_url, ticker);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network)?;

        parse_body(status, &body)
    }

    async fn fetch_history<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/history/{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(network)?;

        parse_body(status, &body)
    }
}

impl AnalysisBackend for ApiClient {
    fn sync<'a>(&'a self, ticker: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(self.sync_ticker(ticker))
    }

    fn analyze<'a>(
        &'a self,
        ticker: &'a str,
        params: &'a AnalysisParams,
    ) -> BackendFuture<'a, AnalyzeResponse> {
        Box::pin(self.analyze_ticker(ticker, params))
    }

    fn quote<'a>(&'a self, ticker: &'a str) -> BackendFuture<'a, Quote> {
        Box::pin(self.fetch_quote(ticker))
    }

    fn history_stats(&self) -> BackendFuture<'_, Vec<AccuracyStat>> {
        Box::pin(self.fetch_history("stats"))
    }

    fn history_log(&self) -> BackendFuture<'_, Vec<PredictionLogEntry>> {
        Box::pin(self.fetch_history("log"))
    }
}

fn network(e: reqwest::Error) -> AppError {
    AppError::Network(e.to_string())
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Extract the `detail` (or `error`) message of a rejection body.
///
/// FastAPI sends `{"detail": "..."}` for raised errors and a list of
/// validation entries for 422s.
pub fn rejection_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let detail = value.get("detail").or_else(|| value.get("error"))?;

    match detail {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(entries) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|e| e.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                Some(detail.to_string())
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn parse_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if !status.is_success() {
        return Err(AppError::ServerRejection {
            status: status.as_u16(),
            detail: rejection_detail(body).unwrap_or_else(|| status_text(status)),
        });
    }

    serde_json::from_slice(body).map_err(|e| AppError::ServerRejection {
        status: status.as_u16(),
        detail: format!("unexpected response: {}", e),
    })
}

/// Interpret the status and body of an analyze call.
///
/// A success status whose body carries an error message instead of chart
/// data is still a rejection.
pub fn parse_analyze_body(status: StatusCode, body: &[u8]) -> Result<AnalyzeResponse> {
    if status.is_success() {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if value.get("chart_data").is_none() {
                if let Some(detail) = rejection_detail(body) {
                    return Err(AppError::ServerRejection {
                        status: status.as_u16(),
                        detail,
                    });
                }
            }
        }
    }

    parse_body(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_detail_string() {
        let body = br#"{"detail": "Dados insuficientes para PETR4"}"#;
        assert_eq!(
            rejection_detail(body),
            Some("Dados insuficientes para PETR4".to_string())
        );
    }

    #[test]
    fn test_rejection_detail_validation_list() {
        let body = br#"{"detail": [{"loc": ["query", "days"], "msg": "value is not a valid integer"}]}"#;
        assert_eq!(
            rejection_detail(body),
            Some("value is not a valid integer".to_string())
        );
    }

    #[test]
    fn test_rejection_detail_missing() {
        assert_eq!(rejection_detail(b"<html>502</html>"), None);
        assert_eq!(rejection_detail(br#"{"ok": true}"#), None);
    }

    #[test]
    fn test_non_success_status_is_rejection() {
        let err = parse_analyze_body(StatusCode::NOT_FOUND, b"").unwrap_err();
        match err {
            AppError::ServerRejection { status, detail } => {
                assert_eq!(status, 404);
                assert_eq!(detail, "Not Found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_success_status_with_error_body_is_rejection() {
        let body = br#"{"error": "Ticker not found"}"#;
        let err = parse_analyze_body(StatusCode::OK, body).unwrap_err();
        assert!(matches!(
            err,
            AppError::ServerRejection { status: 200, ref detail } if detail == "Ticker not found"
        ));
    }

    #[test]
    fn test_success_body_parses() {
        let body = br#"{"ticker":"PETR4","signal":"COMPRA","confidence":0.82,
            "current_price":38.5,"predicted_price":41.2,"variation_pct":7.01,
            "chart_data":{"candles":[{"x":1,"y":[38.0,38.9,37.8,38.5]}]}}"#;
        let response = parse_analyze_body(StatusCode::OK, body).unwrap();
        assert_eq!(response.ticker, "PETR4");
        assert_eq!(response.chart_data.candles.len(), 1);
    }

    #[test]
    fn test_history_list_parses_and_errors_reject() {
        let stats: Vec<AccuracyStat> = parse_body(
            StatusCode::OK,
            br#"[{"ticker":"ITUB4","total_predictions":4,"accuracy":50.0,"avg_error":2.1}]"#,
        )
        .unwrap();
        assert_eq!(stats[0].ticker, "ITUB4");

        let err = parse_body::<Vec<PredictionLogEntry>>(
            StatusCode::INTERNAL_SERVER_ERROR,
            br#"{"detail": "database locked"}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::ServerRejection { status: 500, ref detail } if detail == "database locked"
        ));
    }

    #[test]
    fn test_query_string_repeats_indicators() {
        let params = AnalysisParams::default();
        let query = serde_urlencoded::to_string(params.query_pairs()).unwrap();
        assert_eq!(
            query,
            "days=30&timeframe=D&indicators=vwap&indicators=sma_14&indicators=sma_50&profile=moderate"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://127.0.0.1:8000/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }
}

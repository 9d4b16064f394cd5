//! Sync-then-analyze flow.
//!
//! [`AnalysisOrchestrator`] runs the two backend calls strictly in order,
//! keeps the progress animation in step with the request, and can be
//! cancelled from outside through a [`Canceller`].

use super::progress::ProgressAnimation;
use crate::error::{AppError, Result};
use crate::sources::AnalysisBackend;
use crate::types::{AnalysisParams, AnalysisResult};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Where the current request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Syncing,
    Analyzing,
    Done,
    Failed,
}

/// Cancels whatever run the owning orchestrator has in flight.
#[derive(Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Normalize a user-entered ticker.
///
/// Trims and upper-cases; rejects empty input and characters outside
/// `A-Z`, `0-9`, `.` and `-`.
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::BadRequest("Enter a ticker symbol.".to_string()));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(AppError::BadRequest(format!("Invalid ticker: {}", raw.trim())));
    }
    Ok(ticker)
}

pub struct AnalysisOrchestrator {
    backend: Arc<dyn AnalysisBackend>,
    progress: ProgressAnimation,
    state: RequestState,
    cancel: Arc<watch::Sender<bool>>,
}

impl AnalysisOrchestrator {
    pub fn new(backend: Arc<dyn AnalysisBackend>, progress: ProgressAnimation) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            backend,
            progress,
            state: RequestState::Idle,
            cancel: Arc::new(tx),
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn progress(&self) -> &ProgressAnimation {
        &self.progress
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            tx: self.cancel.clone(),
        }
    }

    /// Run sync then analyze for `ticker`.
    ///
    /// A cancel sent before the run is first polled still aborts it.
    pub async fn run(&mut self, ticker: &str, params: &AnalysisParams) -> Result<AnalysisResult> {
        let outcome = self.execute(ticker, params).await;
        // The flag belongs to the run that just ended.
        self.cancel.send_replace(false);
        outcome
    }

    async fn execute(&mut self, ticker: &str, params: &AnalysisParams) -> Result<AnalysisResult> {
        let ticker = normalize_ticker(ticker)?;
        let mut cancelled = self.cancel.subscribe();

        self.progress.start();
        info!("Starting analysis of {}", ticker);

        let backend = self.backend.clone();
        let state = &mut self.state;
        let flow = async {
            *state = RequestState::Syncing;
            backend.sync(&ticker).await?;

            *state = RequestState::Analyzing;
            let response = backend.analyze(&ticker, params).await?;
            Ok::<_, AppError>(AnalysisResult::from_response(response, params))
        };

        let outcome = tokio::select! {
            biased;
            _ = cancelled.wait_for(|c| *c) => Err(AppError::Cancelled),
            result = flow => result,
        };

        match outcome {
            Ok(result) => {
                self.state = RequestState::Done;
                self.progress.complete();
                info!(
                    "Analysis of {} finished: {} ({:.1}% confidence)",
                    ticker,
                    result.signal,
                    result.confidence * 100.0
                );
                Ok(result)
            }
            Err(e) => {
                self.state = RequestState::Failed;
                self.progress.cancel();
                match &e {
                    AppError::Cancelled => warn!("Analysis of {} cancelled", ticker),
                    other => error!("Analysis of {} failed: {}", ticker, other),
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProgressConfig;
    use crate::services::{AnimationState, ProgressUpdate};
    use crate::sources::BackendFuture;
    use crate::types::{AccuracyStat, AnalyzeResponse, PredictionLogEntry, Quote, RawChartData};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct StubBackend {
        sync_calls: AtomicUsize,
        analyze_calls: AtomicUsize,
        reject_sync: bool,
        analyze_delay_ms: u64,
    }

    impl AnalysisBackend for StubBackend {
        fn sync<'a>(&'a self, _ticker: &'a str) -> BackendFuture<'a, ()> {
            Box::pin(async move {
                self.sync_calls.fetch_add(1, Ordering::SeqCst);
                if self.reject_sync {
                    return Err(AppError::ServerRejection {
                        status: 404,
                        detail: "unknown ticker".to_string(),
                    });
                }
                Ok(())
            })
        }

        fn analyze<'a>(
            &'a self,
            ticker: &'a str,
            _params: &'a AnalysisParams,
        ) -> BackendFuture<'a, AnalyzeResponse> {
            Box::pin(async move {
                self.analyze_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(self.analyze_delay_ms)).await;
                Ok(AnalyzeResponse {
                    ticker: ticker.to_string(),
                    signal: "COMPRA".to_string(),
                    confidence: 0.82,
                    current_price: 38.5,
                    predicted_price: 41.2,
                    variation_pct: 7.01,
                    chart_data: RawChartData::default(),
                })
            })
        }

        fn quote<'a>(&'a self, _ticker: &'a str) -> BackendFuture<'a, Quote> {
            Box::pin(async { Err(AppError::Network("not stubbed".to_string())) })
        }

        fn history_stats(&self) -> BackendFuture<'_, Vec<AccuracyStat>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn history_log(&self) -> BackendFuture<'_, Vec<PredictionLogEntry>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn orchestrator(
        backend: Arc<StubBackend>,
    ) -> (AnalysisOrchestrator, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = ProgressAnimation::new(ProgressConfig::default(), tx);
        (AnalysisOrchestrator::new(backend, progress), rx)
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("  petr4 ").unwrap(), "PETR4");
        assert_eq!(normalize_ticker("brk.b").unwrap(), "BRK.B");
        assert!(matches!(normalize_ticker("   "), Err(AppError::BadRequest(_))));
        assert!(matches!(normalize_ticker("PETR4/../x"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_sync_rejection_skips_analyze() {
        let backend = Arc::new(StubBackend {
            reject_sync: true,
            ..Default::default()
        });
        let (mut orch, _rx) = orchestrator(backend.clone());

        let err = orch.run("PETR4", &AnalysisParams::default()).await.unwrap_err();

        assert!(matches!(err, AppError::ServerRejection { status: 404, .. }));
        assert_eq!(backend.sync_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.state(), RequestState::Failed);
        assert_eq!(orch.progress().state(), AnimationState::Cancelled);
    }

    #[tokio::test]
    async fn test_bad_ticker_makes_no_calls() {
        let backend = Arc::new(StubBackend::default());
        let (mut orch, _rx) = orchestrator(backend.clone());

        let err = orch.run("", &AnalysisParams::default()).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(backend.sync_calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn test_success_carries_request_context() {
        let backend = Arc::new(StubBackend::default());
        let (mut orch, _rx) = orchestrator(backend.clone());
        let params = AnalysisParams::default();

        let result = orch.run("petr4", &params).await.unwrap();

        assert_eq!(result.ticker, "PETR4");
        assert_eq!(result.horizon, params.horizon());
        assert_eq!(result.profile, Some(params.profile));
        assert_eq!(orch.state(), RequestState::Done);
        assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_run() {
        let backend = Arc::new(StubBackend {
            analyze_delay_ms: 5_000,
            ..Default::default()
        });
        let (mut orch, _rx) = orchestrator(backend.clone());
        let canceller = orch.canceller();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            canceller.cancel();
        });

        let err = orch.run("VALE3", &AnalysisParams::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
        assert_eq!(orch.state(), RequestState::Failed);

        assert_eq!(backend.analyze_calls.load(Ordering::SeqCst), 1);

        // The earlier cancel does not leak into the next run.
        let result = orch.run("VALE3", &AnalysisParams::default()).await.unwrap();
        assert_eq!(result.ticker, "VALE3");
        assert_eq!(orch.state(), RequestState::Done);
    }

    #[tokio::test]
    async fn test_cancel_before_first_poll_is_honoured() {
        let backend = Arc::new(StubBackend::default());
        let (mut orch, _rx) = orchestrator(backend.clone());
        let canceller = orch.canceller();

        let flight = tokio::spawn(async move {
            let outcome = orch.run("PETR4", &AnalysisParams::default()).await;
            (orch, outcome)
        });
        canceller.cancel();

        let (mut orch, outcome) = flight.await.unwrap();
        assert!(matches!(outcome, Err(AppError::Cancelled)));
        assert_eq!(backend.sync_calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.progress().state(), AnimationState::Cancelled);

        let result = orch.run("PETR4", &AnalysisParams::default()).await.unwrap();
        assert_eq!(result.ticker, "PETR4");
        assert_eq!(backend.sync_calls.load(Ordering::SeqCst), 1);
    }
}

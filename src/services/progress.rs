//! Simulated progress for the analysis flow.
//!
//! The backend reports no real progress, so while a run is in flight the
//! animation eases towards a ceiling below 100 and only jumps to 100 when the
//! run completes.

use crate::config::ProgressConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Lifecycle of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    Stopped,
    Running,
    Completed,
    Cancelled,
}

/// Cosmetic stage text shown next to the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    Connecting,
    DownloadingHistory,
    ComputingIndicators,
    RunningModel,
    Done,
}

impl ProgressStage {
    pub fn for_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            ProgressStage::Done
        } else if percent < 10.0 {
            ProgressStage::Connecting
        } else if percent < 40.0 {
            ProgressStage::DownloadingHistory
        } else if percent < 70.0 {
            ProgressStage::ComputingIndicators
        } else {
            ProgressStage::RunningModel
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            ProgressStage::Connecting => "Connecting to the market...",
            ProgressStage::DownloadingHistory => "Downloading price history...",
            ProgressStage::ComputingIndicators => "Computing technical indicators...",
            ProgressStage::RunningModel => "Running the prediction model...",
            ProgressStage::Done => "Done!",
        }
    }
}

/// One progress emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Generation of the run that produced this update.
    pub run: u64,
    pub percent: f64,
    pub stage: ProgressStage,
}

impl ProgressUpdate {
    fn new(run: u64, percent: f64) -> Self {
        Self {
            run,
            percent,
            stage: ProgressStage::for_percent(percent),
        }
    }
}

/// Next eased value, or None when it would not advance below the ceiling.
pub fn next_percent(current: f64, config: &ProgressConfig) -> Option<f64> {
    let next = current + (config.ceiling - current) * config.step;
    (next > current && next < config.ceiling).then_some(next)
}

/// Progress animation driving an update channel.
pub struct ProgressAnimation {
    config: ProgressConfig,
    sink: mpsc::UnboundedSender<ProgressUpdate>,
    state: AnimationState,
    task: Option<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
    run: u64,
}

impl ProgressAnimation {
    pub fn new(config: ProgressConfig, sink: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self::with_generation(config, sink, Arc::new(AtomicU64::new(0)))
    }

    /// Build an animation numbering its runs from a shared counter.
    ///
    /// A replacement animation built on the same counter never reuses a
    /// generation its predecessor already emitted under.
    pub fn with_generation(
        config: ProgressConfig,
        sink: mpsc::UnboundedSender<ProgressUpdate>,
        generation: Arc<AtomicU64>,
    ) -> Self {
        Self {
            config,
            sink,
            state: AnimationState::Stopped,
            task: None,
            generation,
            run: 0,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    /// Generation of the current or most recent run.
    pub fn run(&self) -> u64 {
        self.run
    }

    /// Start a new run, stopping any previous one first.
    pub fn start(&mut self) {
        self.stop_task();
        self.run = self.generation.load(Ordering::SeqCst);
        let _ = self.sink.send(ProgressUpdate::new(self.run, 0.0));

        let config = self.config.clone();
        let sink = self.sink.clone();
        let generation = self.generation.clone();
        let run = self.run;

        self.task = Some(tokio::spawn(async move {
            let tick = Duration::from_millis(config.tick_ms);
            let mut ticker = interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut percent = 0.0;

            loop {
                ticker.tick().await;
                if generation.load(Ordering::SeqCst) != run {
                    break;
                }
                let Some(next) = next_percent(percent, &config) else {
                    continue;
                };
                percent = next;
                if sink.send(ProgressUpdate::new(run, percent)).is_err() {
                    break;
                }
            }
        }));

        self.state = AnimationState::Running;
        debug!("Progress animation run {} started", self.run);
    }

    /// Finish the current run at 100%.
    pub fn complete(&mut self) {
        self.stop_task();
        let _ = self.sink.send(ProgressUpdate::new(self.run, 100.0));
        self.state = AnimationState::Completed;
    }

    /// Tear down the current run without a final emission.
    pub fn cancel(&mut self) {
        self.stop_task();
        if self.state == AnimationState::Running {
            self.state = AnimationState::Cancelled;
            debug!("Progress animation run {} cancelled", self.run);
        }
    }

    fn stop_task(&mut self) {
        // Bumping first keeps an already-woken tick from emitting.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressAnimation {
    fn drop(&mut self) {
        self.stop_task();
    }
}

pub mod chart_builder;
pub mod history;
pub mod orchestrator;
pub mod presenter;
pub mod progress;
pub mod render;
pub mod sanitizer;
pub mod state_store;

pub use chart_builder::{ChartSpecBuilder, ChartView, PrimaryStyle, PRICE_SERIES_NAME};
pub use history::{
    accuracy_tone, load_history, HistoryView, LogRow, Section, StatRow, NO_LOG, NO_STATS,
};
pub use orchestrator::{normalize_ticker, AnalysisOrchestrator, Canceller, RequestState};
pub use presenter::{DashboardFields, DashboardPresenter, Tone};
pub use progress::{AnimationState, ProgressAnimation, ProgressStage, ProgressUpdate};
pub use render::{ChartRenderer, JsonSpecRenderer, RenderHandle};
pub use sanitizer::{sanitize, IndicatorSeries, SanitizedChartData};
pub use state_store::{
    AnalysisStateStore, FileSlotStorage, MemorySlotStorage, SlotStorage, StoredAnalysis,
};

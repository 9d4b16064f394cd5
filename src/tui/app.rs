//! Main TUI application logic.

use super::chart::TerminalRenderer;
use super::events::{self, Event, EventHandler};
use super::form::{self, AnalysisForm, AnalysisRequest, FormAction};
use super::state::LogBuffer;
use super::{dashboard, history, logs, Route, Theme};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::services::{
    load_history, AnalysisOrchestrator, AnalysisStateStore, DashboardPresenter, HistoryView,
    ProgressAnimation, ProgressUpdate, Tone,
};
use crate::sources::AnalysisBackend;
use crate::types::{AnalysisResult, ChartType};
use crossterm::{
    event::KeyCode,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Tabs},
    Frame, Terminal,
};
use std::sync::atomic::AtomicU64;
use std::{io, sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// What the app shows first.
#[derive(Debug, Clone)]
pub enum Startup {
    /// Entry form.
    Form,
    /// Entry form with a notice, after a failed display start-up.
    Notice(String),
    /// Display page for a previously saved analysis.
    Display(AnalysisResult),
}

/// Request from the app to the run loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(AnalysisRequest),
    Cancel,
    LoadHistory,
}

/// A finished analysis waiting for its reveal deadline.
#[derive(Debug, Clone)]
struct PendingReveal {
    at: Instant,
    result: AnalysisResult,
    chart_type: ChartType,
    /// Why the result is not in the slot, if saving failed.
    save_error: Option<String>,
}

#[derive(Debug, Clone)]
struct Status {
    text: String,
    tone: Tone,
}

/// Main TUI application.
pub struct App {
    route: Route,
    theme: Theme,
    form: AnalysisForm,
    presenter: DashboardPresenter<TerminalRenderer>,
    store: AnalysisStateStore,
    log_buffer: Arc<LogBuffer>,
    progress: Option<ProgressUpdate>,
    /// Oldest progress generation still accepted.
    min_run: u64,
    running: bool,
    reveal: Option<PendingReveal>,
    reveal_delay: Duration,
    history: Option<HistoryView>,
    history_loading: bool,
    status: Option<Status>,
    should_quit: bool,
}

impl App {
    /// Create a new TUI application.
    pub fn new(config: &Config, store: AnalysisStateStore, log_buffer: Arc<LogBuffer>) -> Self {
        Self {
            route: Route::Form,
            theme: Theme::default(),
            form: AnalysisForm::default(),
            presenter: DashboardPresenter::new(
                TerminalRenderer::new(),
                config.display.currency_prefix.clone(),
            ),
            store,
            log_buffer,
            progress: None,
            min_run: 0,
            running: false,
            reveal: None,
            reveal_delay: Duration::from_millis(config.display.reveal_delay_ms),
            history: None,
            history_loading: false,
            status: None,
            should_quit: false,
        }
    }

    /// Apply the start-up mode.
    pub fn start(&mut self, startup: Startup) {
        match startup {
            Startup::Form => {}
            Startup::Notice(text) => {
                self.route = Route::Form;
                self.set_status(text, Tone::Loss);
            }
            Startup::Display(result) => {
                let chart_type = self.form.chart_type;
                self.show(&result, chart_type, None);
            }
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn presenter(&self) -> &DashboardPresenter<TerminalRenderer> {
        &self.presenter
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.text.as_str())
    }

    pub fn progress(&self) -> Option<&ProgressUpdate> {
        self.progress.as_ref()
    }

    pub fn history(&self) -> Option<&HistoryView> {
        self.history.as_ref()
    }

    /// Handle an event.
    pub fn handle_event(&mut self, event: Event) -> Option<Command> {
        let key = match event {
            Event::Key(key) => key,
            Event::Resize(..) => {
                if let Err(e) = self.presenter.rerender() {
                    error!("Chart re-render failed: {}", e);
                    self.set_status(e.user_message(), Tone::Loss);
                }
                return None;
            }
            Event::Tick => return None,
        };

        if events::is_quit(&key) {
            self.should_quit = true;
            return None;
        }

        // Route navigation
        if let Some(route) = Route::all().into_iter().find(|r| key.code == r.key()) {
            self.route = route;
            if route == Route::History {
                return self.request_history();
            }
            return None;
        }

        match self.route {
            Route::Form => match self.form.handle_key(&key) {
                FormAction::Submit => self.submit(),
                FormAction::Cancel if self.running => Some(Command::Cancel),
                FormAction::Cancel | FormAction::None => None,
            },
            Route::Dashboard => {
                if events::is_key(&key, KeyCode::Esc) && self.running {
                    return Some(Command::Cancel);
                }
                if events::is_key(&key, KeyCode::Char('t')) {
                    self.toggle_chart_type();
                }
                None
            }
            Route::History => {
                if events::is_key(&key, KeyCode::Char('r')) {
                    return self.request_history();
                }
                None
            }
            Route::Logs => {
                if events::is_key(&key, KeyCode::Char('c')) {
                    self.log_buffer.clear();
                }
                None
            }
        }
    }

    fn submit(&mut self) -> Option<Command> {
        if self.running {
            self.set_status("An analysis is already running.".to_string(), Tone::Neutral);
            return None;
        }
        match self.form.to_request() {
            Ok(request) => Some(Command::Start(request)),
            Err(e) => {
                self.set_status(e.user_message(), Tone::Loss);
                None
            }
        }
    }

    fn request_history(&mut self) -> Option<Command> {
        if self.history_loading {
            return None;
        }
        self.history_loading = true;
        Some(Command::LoadHistory)
    }

    /// A history fetch returned.
    pub fn on_history(&mut self, view: HistoryView) {
        self.history_loading = false;
        self.history = Some(view);
    }

    fn toggle_chart_type(&mut self) {
        let Some(current) = self.presenter.view().map(|v| v.chart_type()) else {
            return;
        };
        if let Err(e) = self.presenter.switch_chart_type(current.toggled()) {
            error!("Chart type switch failed: {}", e);
            self.set_status(e.user_message(), Tone::Loss);
        }
    }

    /// A run was handed to the orchestrator.
    pub fn on_started(&mut self, request: &AnalysisRequest) {
        self.running = true;
        self.reveal = None;
        self.progress = None;
        // Anything from an earlier generation is stale from here on.
        self.min_run = self.min_run.saturating_add(1);
        self.set_status(format!("Analyzing {}...", request.ticker), Tone::Neutral);
    }

    pub fn on_progress(&mut self, update: ProgressUpdate) {
        if update.run < self.min_run {
            return;
        }
        self.min_run = update.run;
        self.progress = Some(update);
    }

    /// The in-flight run returned.
    pub fn on_finished(&mut self, outcome: Result<AnalysisResult>, chart_type: ChartType) {
        self.running = false;
        match outcome {
            Ok(result) => {
                let save_error = match self.store.save(&result) {
                    Ok(()) => None,
                    Err(e) => {
                        warn!("Could not save analysis for {}: {}", result.ticker, e);
                        self.set_status(e.user_message(), Tone::Loss);
                        Some(e.user_message())
                    }
                };
                self.reveal = Some(PendingReveal {
                    at: Instant::now() + self.reveal_delay,
                    result,
                    chart_type,
                    save_error,
                });
            }
            Err(AppError::Cancelled) => {
                self.progress = None;
                self.set_status(AppError::Cancelled.user_message(), Tone::Neutral);
            }
            Err(e) => {
                self.progress = None;
                self.set_status(e.user_message(), Tone::Loss);
            }
        }
    }

    /// The in-flight task died without returning.
    pub fn on_task_failed(&mut self, reason: &str) {
        self.running = false;
        self.progress = None;
        self.set_status(format!("Analysis stopped unexpectedly: {}", reason), Tone::Loss);
    }

    pub fn reveal_deadline(&self) -> Option<Instant> {
        self.reveal.as_ref().map(|pending| pending.at)
    }

    /// Show the pending result on the dashboard.
    pub fn reveal(&mut self) {
        if let Some(pending) = self.reveal.take() {
            self.show(&pending.result, pending.chart_type, pending.save_error);
        }
    }

    fn show(&mut self, result: &AnalysisResult, chart_type: ChartType, save_error: Option<String>) {
        match self.presenter.present(result, chart_type) {
            Ok(fields) => {
                let text = format!("{}: {}", fields.title, fields.signal);
                self.route = Route::Dashboard;
                match save_error {
                    Some(reason) => {
                        self.set_status(format!("{} (not saved: {})", text, reason), Tone::Loss)
                    }
                    None => self.set_status(text, Tone::Gain),
                }
            }
            Err(e) => {
                error!("Could not present {}: {}", result.ticker, e);
                self.set_status(e.user_message(), Tone::Loss);
            }
        }
    }

    fn set_status(&mut self, text: String, tone: Tone) {
        self.status = Some(Status { text, tone });
    }

    /// Check if the app should quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Render the TUI.
    pub fn render(&self, frame: &mut Frame) {
        let area = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Status bar
            ])
            .split(area);

        self.render_tabs(frame, chunks[0]);

        match self.route {
            Route::Form => form::render(frame, chunks[1], &self.form, self.progress.as_ref(), &self.theme),
            Route::Dashboard => dashboard::render(frame, chunks[1], &self.presenter, &self.theme),
            Route::History => history::render(
                frame,
                chunks[1],
                self.history.as_ref(),
                self.history_loading,
                &self.theme,
            ),
            Route::Logs => logs::render(frame, chunks[1], &self.log_buffer, &self.theme),
        }

        self.render_status_bar(frame, chunks[2]);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let routes = Route::all();
        let titles: Vec<Line> = routes
            .iter()
            .enumerate()
            .map(|(i, r)| {
                Line::from(vec![
                    Span::styled(format!("[F{}] ", i + 1), self.theme.muted()),
                    Span::raw(r.name()),
                ])
            })
            .collect();

        let selected = routes
            .iter()
            .position(|r| *r == self.route)
            .unwrap_or(0);

        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("quantdash"))
            .select(selected)
            .style(self.theme.tab_inactive())
            .highlight_style(self.theme.tab_active());

        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let text = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), self.theme.tone(status.tone))),
            None => Line::from(vec![
                Span::styled("Ctrl+C", self.theme.muted()),
                Span::raw(" to quit | "),
                Span::styled("F1-F4", self.theme.muted()),
                Span::raw(" to switch views | "),
                Span::styled("t", self.theme.muted()),
                Span::raw(" toggles chart type"),
            ]),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border());
        let inner = block.inner(area);

        frame.render_widget(block, area);
        frame.render_widget(text, inner);
    }
}

type Flight = JoinHandle<(AnalysisOrchestrator, Result<AnalysisResult>, ChartType)>;

async fn join_flight(
    flight: &mut Option<Flight>,
) -> std::result::Result<(AnalysisOrchestrator, Result<AnalysisResult>, ChartType), JoinError> {
    match flight {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Run the TUI application.
pub async fn run_tui(
    config: Config,
    backend: Arc<dyn AnalysisBackend>,
    store: AnalysisStateStore,
    log_buffer: Arc<LogBuffer>,
    startup: Startup,
) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let (history_tx, mut history_rx) = mpsc::unbounded_channel();
    // Replacement orchestrators keep numbering runs where the lost one stopped.
    let generation = Arc::new(AtomicU64::new(0));
    let new_orchestrator = || {
        AnalysisOrchestrator::new(
            backend.clone(),
            ProgressAnimation::with_generation(
                config.progress.clone(),
                progress_tx.clone(),
                generation.clone(),
            ),
        )
    };
    let mut orchestrator = Some(new_orchestrator());
    let mut canceller = orchestrator.as_ref().map(|o| o.canceller());
    let mut flight: Option<Flight> = None;

    let mut app = App::new(&config, store, log_buffer);
    app.start(startup);
    let mut event_handler = EventHandler::new(Duration::from_millis(250));
    info!("TUI started against {}", config.api_base_url);

    // Main loop
    let outcome = loop {
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e);
        }

        let reveal_at = app.reveal_deadline();
        tokio::select! {
            event = event_handler.next() => match event {
                Some(event) => match app.handle_event(event) {
                    Some(Command::Start(request)) => {
                        if let Some(mut orch) = orchestrator.take() {
                            app.on_started(&request);
                            flight = Some(tokio::spawn(async move {
                                let result = orch.run(&request.ticker, &request.params).await;
                                (orch, result, request.chart_type)
                            }));
                        }
                    }
                    Some(Command::Cancel) => {
                        if let Some(canceller) = &canceller {
                            canceller.cancel();
                        }
                    }
                    Some(Command::LoadHistory) => {
                        let backend = backend.clone();
                        let history_tx = history_tx.clone();
                        let prefix = config.display.currency_prefix.clone();
                        tokio::spawn(async move {
                            let view = load_history(backend.as_ref(), &prefix).await;
                            let _ = history_tx.send(view);
                        });
                    }
                    None => {}
                },
                None => break Ok(()),
            },
            Some(update) = progress_rx.recv() => app.on_progress(update),
            Some(view) = history_rx.recv() => app.on_history(view),
            joined = join_flight(&mut flight) => {
                flight = None;
                match joined {
                    Ok((orch, result, chart_type)) => {
                        orchestrator = Some(orch);
                        app.on_finished(result, chart_type);
                    }
                    Err(e) => {
                        error!("Analysis task failed: {}", e);
                        let orch = new_orchestrator();
                        canceller = Some(orch.canceller());
                        orchestrator = Some(orch);
                        app.on_task_failed(&e.to_string());
                    }
                }
            }
            _ = tokio::time::sleep_until(reveal_at.unwrap_or_else(Instant::now)), if reveal_at.is_some() => {
                app.reveal();
            }
        }

        if app.should_quit() {
            break Ok(());
        }
    };

    if let Some(handle) = flight.take() {
        handle.abort();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DisplayConfig, ProgressConfig, StateConfig};
    use crate::services::{MemorySlotStorage, ProgressStage, Section, NO_LOG, NO_STATS};
    use crate::types::{Horizon, HorizonUnit, RawChartData};
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn test_config() -> Config {
        Config {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 5,
            state: StateConfig::default(),
            progress: ProgressConfig::default(),
            display: DisplayConfig::default(),
        }
    }

    fn test_app() -> App {
        let store = AnalysisStateStore::new(Arc::new(MemorySlotStorage::new()), "chartData");
        App::new(&test_config(), store, Arc::new(LogBuffer::new(10)))
    }

    fn press(app: &mut App, code: KeyCode) -> Option<Command> {
        app.handle_event(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            ticker: "PETR4".to_string(),
            signal: "COMPRA".to_string(),
            confidence: 0.82,
            current_price: 38.5,
            predicted_price: 41.2,
            variation_pct: 7.01,
            horizon: Horizon {
                count: 30,
                unit: HorizonUnit::Days,
            },
            profile: None,
            chart_data: RawChartData::default(),
        }
    }

    fn vale3_request() -> AnalysisRequest {
        let mut form = AnalysisForm::default();
        form.ticker = "VALE3".to_string();
        form.to_request().unwrap()
    }

    fn update(run: u64, percent: f64) -> ProgressUpdate {
        ProgressUpdate {
            run,
            percent,
            stage: ProgressStage::for_percent(percent),
        }
    }

    #[test]
    fn test_submit_produces_start_command() {
        let mut app = test_app();
        for c in "petr4".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        match press(&mut app, KeyCode::Enter) {
            Some(Command::Start(request)) => assert_eq!(request.ticker, "PETR4"),
            other => panic!("expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_submit_sets_status() {
        let mut app = test_app();
        assert_eq!(press(&mut app, KeyCode::Enter), None);
        assert!(app.status_text().is_some());
    }

    #[test]
    fn test_esc_cancels_only_while_running() {
        let mut app = test_app();
        assert_eq!(press(&mut app, KeyCode::Esc), None);

        let request = vale3_request();
        app.on_started(&request);
        assert_eq!(press(&mut app, KeyCode::Esc), Some(Command::Cancel));
        assert_eq!(press(&mut app, KeyCode::Enter), None);
    }

    #[test]
    fn test_stale_progress_ignored() {
        let mut app = test_app();
        let request = vale3_request();

        app.on_started(&request);
        app.on_progress(update(1, 0.0));
        app.on_progress(update(1, 5.4));
        app.on_finished(Err(AppError::Cancelled), ChartType::Candlestick);

        app.on_started(&request);
        app.on_progress(update(1, 10.5));
        assert!(app.progress().is_none());
        app.on_progress(update(2, 0.0));
        app.on_progress(update(1, 15.0));
        assert_eq!(app.progress().map(|p| (p.run, p.percent)), Some((2, 0.0)));
    }

    #[tokio::test]
    async fn test_success_saves_then_reveals_dashboard() {
        let storage = Arc::new(MemorySlotStorage::new());
        let store = AnalysisStateStore::new(storage.clone(), "chartData");
        let mut app = App::new(&test_config(), store, Arc::new(LogBuffer::new(10)));

        app.on_finished(Ok(sample_result()), ChartType::AreaOfClose);
        assert!(app.reveal_deadline().is_some());
        assert_eq!(app.route(), Route::Form);

        let saved = AnalysisStateStore::new(storage, "chartData")
            .load()
            .unwrap()
            .into_result()
            .unwrap();
        assert_eq!(saved, sample_result());

        app.reveal();
        assert_eq!(app.route(), Route::Dashboard);
        assert_eq!(app.presenter().renderer().live_instances(), 1);
        assert_eq!(
            app.presenter().view().map(|v| v.chart_type()),
            Some(ChartType::AreaOfClose)
        );
    }

    struct ReadOnlyStorage;

    impl crate::services::SlotStorage for ReadOnlyStorage {
        fn read(&self, _key: &str) -> io::Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only fs"))
        }

        fn remove(&self, _key: &str) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_save_failure_stays_visible_after_reveal() {
        let store = AnalysisStateStore::new(Arc::new(ReadOnlyStorage), "chartData");
        let mut app = App::new(&test_config(), store, Arc::new(LogBuffer::new(10)));

        app.on_finished(Ok(sample_result()), ChartType::Candlestick);
        assert!(app.status_text().unwrap().contains("read-only fs"));

        app.reveal();
        assert_eq!(app.route(), Route::Dashboard);
        let status = app.status_text().unwrap();
        assert!(status.contains("COMPRA"), "{}", status);
        assert!(status.contains("not saved"), "{}", status);
        assert!(status.contains("read-only fs"), "{}", status);
    }

    #[test]
    fn test_history_route_loads_once_until_answered() {
        let mut app = test_app();
        assert_eq!(press(&mut app, KeyCode::F(3)), Some(Command::LoadHistory));
        assert_eq!(app.route(), Route::History);
        assert_eq!(press(&mut app, KeyCode::Char('r')), None);

        app.on_history(HistoryView {
            stats: Section::Empty(NO_STATS),
            log: Section::Empty(NO_LOG),
        });
        assert!(app.history().is_some());
        assert_eq!(press(&mut app, KeyCode::Char('r')), Some(Command::LoadHistory));
    }

    #[test]
    fn test_notice_startup_stays_on_form() {
        let mut app = test_app();
        app.start(Startup::Notice("No analysis data found.".to_string()));
        assert_eq!(app.route(), Route::Form);
        assert_eq!(app.status_text(), Some("No analysis data found."));
    }

    #[test]
    fn test_display_startup_and_toggle() {
        let mut app = test_app();
        app.start(Startup::Display(sample_result()));
        assert_eq!(app.route(), Route::Dashboard);

        press(&mut app, KeyCode::Char('t'));
        assert_eq!(
            app.presenter().view().map(|v| v.chart_type()),
            Some(ChartType::AreaOfClose)
        );
        assert_eq!(app.presenter().renderer().live_instances(), 1);
    }

    #[test]
    fn test_function_keys_switch_routes() {
        let mut app = test_app();
        press(&mut app, KeyCode::F(4));
        assert_eq!(app.route(), Route::Logs);
        press(&mut app, KeyCode::F(2));
        assert_eq!(app.route(), Route::Dashboard);
    }
}

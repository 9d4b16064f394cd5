use anyhow::Context;
use clap::{Parser, Subcommand};
use quantdash::services::{
    load_history, normalize_ticker, AnalysisOrchestrator, AnalysisStateStore, DashboardFields,
    DashboardPresenter, FileSlotStorage, HistoryView, JsonSpecRenderer, ProgressAnimation, Section,
    StoredAnalysis,
};
use quantdash::sources::{AnalysisBackend, ApiClient};
use quantdash::tui::{self, LogBuffer, LogMakeWriter, Startup};
use quantdash::{
    AnalysisParams, AppError, ChartType, Config, HorizonUnit, IndicatorKind, RiskProfile,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_BUFFER_LINES: usize = 500;

/// quantdash - stock analysis dashboard in the terminal
#[derive(Parser, Debug)]
#[command(name = "quantdash")]
#[command(about = "Request a quantitative stock analysis and chart the result")]
#[command(version)]
struct Args {
    /// Base URL of the analysis backend
    #[arg(long, env = "API_BASE_URL", global = true)]
    api_url: Option<String>,

    /// Directory holding the saved analysis slot
    #[arg(long, env = "STATE_DIR", global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive entry form and dashboard (default)
    App,

    /// Run one analysis without the TUI and save it for `chart`
    Analyze {
        /// Ticker symbol, e.g. PETR4
        ticker: String,

        /// Horizon length
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Horizon unit (D, W, M, Y)
        #[arg(long, default_value = "D")]
        timeframe: HorizonUnit,

        /// Indicators to request (vwap, sma_14, sma_50, bb_upper, bb_lower)
        #[arg(long = "indicator", value_delimiter = ',')]
        indicators: Vec<IndicatorKind>,

        /// Risk profile (conservative, moderate, aggressive)
        #[arg(long, default_value = "moderate")]
        profile: RiskProfile,

        /// Chart type for --spec (candlestick, area)
        #[arg(long, default_value = "candlestick")]
        chart: ChartType,

        /// Print the chart spec as JSON instead of the dashboard fields
        #[arg(long)]
        spec: bool,
    },

    /// Show the last saved analysis
    Chart,

    /// Print the latest quote for a ticker
    Quote {
        /// Ticker symbol
        ticker: String,
    },

    /// Print the accuracy ranking and the log of past analyses
    History,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(url) = args.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(dir) = args.state_dir {
        config.state.dir = dir;
    }

    let command = args.command.unwrap_or(Commands::App);
    let log_buffer = match command {
        Commands::App | Commands::Chart => Some(Arc::new(LogBuffer::new(LOG_BUFFER_LINES))),
        _ => None,
    };
    init_tracing(log_buffer.clone());
    debug!("Configuration: {:?}", config);

    let storage = FileSlotStorage::new(&config.state.dir)
        .with_context(|| format!("creating state directory {:?}", config.state.dir))?;
    let store = AnalysisStateStore::new(Arc::new(storage), config.state.key.clone());
    let backend: Arc<dyn AnalysisBackend> = Arc::new(ApiClient::from_config(&config));

    match command {
        Commands::App => {
            let buffer = log_buffer.unwrap_or_else(|| Arc::new(LogBuffer::new(LOG_BUFFER_LINES)));
            tui::run_tui(config, backend, store, buffer, Startup::Form).await?;
        }
        Commands::Chart => {
            let startup = display_startup(&store);
            let buffer = log_buffer.unwrap_or_else(|| Arc::new(LogBuffer::new(LOG_BUFFER_LINES)));
            tui::run_tui(config, backend, store, buffer, startup).await?;
        }
        Commands::Analyze {
            ticker,
            days,
            timeframe,
            indicators,
            profile,
            chart,
            spec,
        } => {
            let params = AnalysisParams {
                days,
                timeframe,
                indicators: if indicators.is_empty() {
                    AnalysisParams::default().indicators
                } else {
                    indicators
                },
                profile,
            };
            analyze(&config, backend, &store, &ticker, &params, chart, spec).await?;
        }
        Commands::Quote { ticker } => {
            let ticker = normalize_ticker(&ticker).map_err(fail)?;
            let quote = backend.quote(&ticker).await.map_err(fail)?;
            let prefix = &config.display.currency_prefix;
            println!("{}", ticker);
            println!("  Price:      {}{:.2}", prefix, quote.price);
            println!("  52w low:    {}{:.2}", prefix, quote.low_52k);
            println!("  52w high:   {}{:.2}", prefix, quote.high_52k);
            println!("  52w avg:    {}{:.2}", prefix, quote.avg_52k);
            if let Some(position) = quote.range_position() {
                println!("  52w range:  {:.0}%", position * 100.0);
            }
        }
        Commands::History => {
            let view = load_history(backend.as_ref(), &config.display.currency_prefix).await;
            print_history(&view);
        }
    }

    Ok(())
}

fn init_tracing(log_buffer: Option<Arc<LogBuffer>>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "quantdash=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match log_buffer {
        // The terminal is in raw mode; logs go to the Logs view.
        Some(buffer) => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(LogMakeWriter::new(buffer)),
            )
            .init(),
        None => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
}

/// Decide what the display page shows, from the saved slot only.
fn display_startup(store: &AnalysisStateStore) -> Startup {
    match store.load().and_then(StoredAnalysis::into_result) {
        Ok(result) => {
            info!("Loaded saved analysis for {}", result.ticker);
            Startup::Display(result)
        }
        Err(e @ AppError::StateAbsent) => {
            warn!("No saved analysis in slot {}; redirecting to the form", store.key());
            Startup::Notice(e.user_message())
        }
        Err(e @ AppError::StateCorrupt(_)) => {
            error!("Saved analysis in slot {} is not valid JSON: {}", store.key(), e);
            Startup::Notice(e.user_message())
        }
        Err(e @ AppError::StateInvalid(_)) => {
            error!("Saved analysis in slot {} has an unexpected shape: {}", store.key(), e);
            Startup::Notice(e.user_message())
        }
        Err(e) => {
            error!("Could not read slot {}: {}", store.key(), e);
            Startup::Notice(e.user_message())
        }
    }
}

async fn analyze(
    config: &Config,
    backend: Arc<dyn AnalysisBackend>,
    store: &AnalysisStateStore,
    ticker: &str,
    params: &AnalysisParams,
    chart_type: ChartType,
    print_spec: bool,
) -> anyhow::Result<()> {
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let mut orchestrator =
        AnalysisOrchestrator::new(backend, ProgressAnimation::new(config.progress.clone(), progress_tx));

    let canceller = orchestrator.canceller();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });
    let printer = tokio::spawn(async move {
        let mut stderr = io::stderr();
        while let Some(update) = progress_rx.recv().await {
            let _ = write!(stderr, "\r{:>5.1}% {:<40}", update.percent, update.stage.text());
            let _ = stderr.flush();
        }
    });

    let outcome = orchestrator.run(ticker, params).await;
    ctrl_c.abort();
    drop(orchestrator);
    let _ = printer.await;
    eprintln!();

    let result = outcome.map_err(fail)?;
    store.save(&result).map_err(fail)?;

    if print_spec {
        let mut presenter = DashboardPresenter::new(
            JsonSpecRenderer::new(io::stdout()),
            config.display.currency_prefix.clone(),
        );
        presenter.present(&result, chart_type).map_err(fail)?;
        presenter.clear();
        return Ok(());
    }

    let fields = DashboardFields::from_result(&result, &config.display.currency_prefix);
    println!("{}", fields.title);
    println!("  Signal:      {}", fields.signal);
    println!("  Confidence:  {}", fields.confidence);
    println!("  Current:     {}", fields.current_price);
    println!("  Predicted:   {}", fields.predicted_price);
    println!("  Horizon:     {}", fields.horizon);
    println!("  Variation:   {}", fields.variation);
    println!();
    println!("Saved to slot '{}'. Run `quantdash chart` to view it.", store.key());
    Ok(())
}

fn print_history(view: &HistoryView) {
    println!("Accuracy by ticker");
    match &view.stats {
        Section::Rows(rows) => {
            println!("  {:<8} {:>6} {:>9} {:>10}", "Ticker", "Total", "Accuracy", "Avg error");
            for row in rows {
                println!(
                    "  {:<8} {:>6} {:>9} {:>10}",
                    row.ticker, row.total, row.accuracy, row.avg_error
                );
            }
        }
        Section::Empty(message) => println!("  {}", message),
        Section::Failed(message) => println!("  {}", message),
    }

    println!();
    println!("Analysis log");
    match &view.log {
        Section::Rows(rows) => {
            for row in rows {
                println!(
                    "  {} {}  {:<8} -> {}  predicted {:>10}  real {:>10}  [{}]",
                    row.outcome.icon(),
                    row.date,
                    row.ticker,
                    row.target_date,
                    row.predicted,
                    row.real,
                    row.indicators.join(", ")
                );
            }
        }
        Section::Empty(message) => println!("  {}", message),
        Section::Failed(message) => println!("  {}", message),
    }
}

/// Attach the user-facing message to an application error.
fn fail(e: AppError) -> anyhow::Error {
    let message = e.user_message();
    anyhow::Error::new(e).context(message)
}

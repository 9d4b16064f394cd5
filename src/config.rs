use std::env;
use std::path::PathBuf;

/// Progress animation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressConfig {
    /// Interval between progress emissions (ms).
    pub tick_ms: u64,
    /// Percentage the animation approaches but never reaches while waiting.
    pub ceiling: f64,
    /// Fraction of the remaining distance to the ceiling covered per tick.
    pub step: f64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            ceiling: 90.0,
            step: 0.06,
        }
    }
}

/// Persisted analysis slot configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    /// Directory holding the slot file.
    pub dir: PathBuf,
    /// Fixed slot key shared by the producing and the displaying process.
    pub key: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".quantdash"),
            key: "chartData".to_string(),
        }
    }
}

/// Presentation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    /// Prefix for monetary values in tooltips and dashboard fields.
    pub currency_prefix: String,
    /// Pause at 100% before the dashboard is revealed (ms).
    pub reveal_delay_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_prefix: "R$ ".to_string(),
            reveal_delay_ms: 600,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the analysis backend.
    pub api_base_url: String,
    /// HTTP request timeout (seconds).
    pub request_timeout_secs: u64,
    pub state: StateConfig,
    pub progress: ProgressConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let progress_defaults = ProgressConfig::default();
        let state_defaults = StateConfig::default();
        let display_defaults = DisplayConfig::default();

        Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            state: StateConfig {
                dir: env::var("STATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(state_defaults.dir),
                key: env::var("STATE_KEY").unwrap_or(state_defaults.key),
            },
            progress: ProgressConfig {
                tick_ms: env::var("PROGRESS_TICK_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|&ms: &u64| ms > 0)
                    .unwrap_or(progress_defaults.tick_ms),
                ceiling: env::var("PROGRESS_CEILING")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|&c: &f64| c > 0.0 && c < 100.0)
                    .unwrap_or(progress_defaults.ceiling),
                step: env::var("PROGRESS_STEP")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|&s: &f64| s > 0.0 && s < 1.0)
                    .unwrap_or(progress_defaults.step),
            },
            display: DisplayConfig {
                currency_prefix: env::var("CURRENCY_PREFIX")
                    .unwrap_or(display_defaults.currency_prefix),
                reveal_delay_ms: env::var("REVEAL_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(display_defaults.reveal_delay_ms),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

//! Terminal UI: entry form, dashboard, history and log views.

mod app;
mod chart;
mod dashboard;
mod events;
mod form;
mod history;
mod logs;
mod state;
mod theme;

pub use app::{run_tui, App, Command, Startup};
pub use chart::{ChartWidget, TerminalRenderer};
pub use form::{AnalysisForm, AnalysisRequest, FormAction, FormField};
pub use state::{LogBuffer, LogMakeWriter};
pub use theme::Theme;

use crossterm::event::KeyCode;

/// Route/View enum for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Form,
    Dashboard,
    History,
    Logs,
}

impl Route {
    /// Get all available routes.
    pub fn all() -> Vec<Self> {
        vec![Self::Form, Self::Dashboard, Self::History, Self::Logs]
    }

    /// Get the route name.
    pub fn name(&self) -> &str {
        match self {
            Self::Form => "Analyze",
            Self::Dashboard => "Dashboard",
            Self::History => "History",
            Self::Logs => "Logs",
        }
    }

    /// Get the route shortcut key. Function keys leave letters and digits to
    /// the form.
    pub fn key(&self) -> KeyCode {
        match self {
            Self::Form => KeyCode::F(1),
            Self::Dashboard => KeyCode::F(2),
            Self::History => KeyCode::F(3),
            Self::Logs => KeyCode::F(4),
        }
    }
}

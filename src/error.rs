use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transport-level failure (backend unreachable, timeout, broken connection).
    #[error("Network failure: {0}")]
    Network(String),

    /// Transport succeeded but the server refused the request.
    #[error("Server rejected request ({status}): {detail}")]
    ServerRejection { status: u16, detail: String },

    #[error("No saved analysis found")]
    StateAbsent,

    #[error("Saved analysis is corrupted: {0}")]
    StateCorrupt(String),

    #[error("Saved analysis has an unexpected shape: {0}")]
    StateInvalid(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl AppError {
    /// Message suitable for the status line or an alert.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => {
                "Could not reach the analysis server. Check that the backend is running.".to_string()
            }
            AppError::ServerRejection { detail, .. } => {
                format!("The server could not complete the analysis: {}", detail)
            }
            AppError::StateAbsent => {
                "No analysis data found. Run an analysis first.".to_string()
            }
            AppError::StateCorrupt(_) | AppError::StateInvalid(_) => {
                "Saved analysis data is corrupted. Run the analysis again.".to_string()
            }
            AppError::Cancelled => "Analysis cancelled.".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Render(msg) => format!("Could not draw the chart: {}", msg),
            AppError::Storage(e) => format!("Could not access local storage: {}", e),
            AppError::SerdeJson(e) => format!("Unexpected data format: {}", e),
        }
    }

    /// Whether this failure came from the transport rather than the server.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_and_rejection_messages_differ() {
        let network = AppError::Network("connection refused".to_string());
        let rejection = AppError::ServerRejection {
            status: 404,
            detail: "Dados insuficientes".to_string(),
        };

        assert!(network.is_network());
        assert!(!rejection.is_network());
        assert_ne!(network.user_message(), rejection.user_message());
        assert!(rejection.user_message().contains("Dados insuficientes"));
    }

    #[test]
    fn test_rejection_display_includes_status() {
        let err = AppError::ServerRejection {
            status: 422,
            detail: "bad ticker".to_string(),
        };
        assert_eq!(err.to_string(), "Server rejected request (422): bad ticker");
    }
}

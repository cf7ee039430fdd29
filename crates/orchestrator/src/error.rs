use forensics_core::CoreError;
use reasoning::ReasoningError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid debate transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{analyzer} failed: {reason}")]
    AnalyzerFailed { analyzer: String, reason: String },

    #[error("Could not build analysis context: {0}")]
    Context(#[from] CoreError),

    #[error("Reasoning service error: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Reverse image search failed: {0}")]
    ReverseSearch(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrchestratorError {
    /// Create an analyzer failure error.
    pub fn analyzer_failed(analyzer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AnalyzerFailed {
            analyzer: analyzer.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for OrchestratorError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

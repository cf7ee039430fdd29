use thiserror::Error;

/// Reasoning service error types
#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("OpenRouter API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },

    #[error("OpenRouter rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },

    #[error("Missing API key: set {0}")]
    MissingApiKey(String),

    #[error("Empty completion returned")]
    EmptyCompletion,

    #[error("Could not load image {path}: {reason}")]
    Image { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ReasoningError {
    pub fn image(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Image {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether a retry has a chance of succeeding
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api {
                status_code: Some(code),
                ..
            } => *code >= 500,
            _ => false,
        }
    }
}

/// Result type alias for reasoning operations
pub type ReasoningResult<T> = Result<T, ReasoningError>;

//! Error types for the harvesting library.

use thiserror::Error;

/// Library-level error. Anything that reaches the caller as an `AppError` is
/// fatal for the batch; per-domain fetch problems are expressed as
/// [`FetchError`] and contained inside the harvester.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Insufficient input: {0}")]
    InsufficientInput(String),

    #[error("Domain extraction failed: {0}")]
    DomainExtraction(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Outcome of a single failed page retrieval.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request or page load exceeded its deadline.
    #[error("timed out")]
    Timeout,

    /// Connection, TLS or protocol failure. Not retried.
    #[error("network error: {0}")]
    Network(String),

    /// Anything else surfacing from a fetch or render step.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl FetchError {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Network(_) => "network",
            FetchError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

//! Error types for the density analyzer.

use thiserror::Error;

/// Errors produced by the analyzer and the provider clients.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} returned status {status}: {message}")]
    Provider {
        provider: &'static str,
        status: String,
        message: String,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid polygon: {0}")]
    Polygon(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("polygon needs more than {limit} search tiles")]
    TooManyTiles { limit: usize },

    #[error("missing column '{column}' (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error(
        "not enough reachable points ({found}/3 minimum): {successes} successful probes, {failures} failed probes"
    )]
    NotEnoughReachable {
        found: usize,
        successes: usize,
        failures: usize,
    },
}

impl Error {
    pub(crate) fn provider(provider: &'static str, status: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider,
            status: status.into(),
            message: message.into(),
        }
    }
}

/// Result alias for analyzer operations.
pub type Result<T> = std::result::Result<T, Error>;

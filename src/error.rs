//! Custom error types for the forecast pipeline
//!
//! Instrument-level failures are plain values the orchestrator branches on;
//! only configuration defects and a missing weather forecast abort a run.

use thiserror::Error;

/// Top-level forecast errors
#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Word bank has no prose kind '{kind}'")]
    MissingProseKind { kind: String },

    #[error("Provider '{name}' is not registered")]
    UnregisteredProvider { name: String },

    #[error("Weather forecast unavailable: {0}")]
    Weather(#[from] WeatherError),

    /// Only ever seen per line; the orchestrator downgrades it to an error line
    #[error("Line rendering failed: {0}")]
    Format(#[from] FormatError),

    #[error("Forum error: {0}")]
    Forum(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Fetch collaborator errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts (last: {last})")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client unavailable: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Raised when a value cannot be turned into a finite number
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("'{raw}' is not a number")]
    NotANumber { raw: String },

    #[error("{value} is not finite")]
    NotFinite { value: f64 },
}

/// Line template substitution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Template references unknown field '{field}'")]
    MissingField { field: String },

    #[error("Field '{field}' is empty")]
    EmptyValue { field: String },

    #[error("Malformed template near byte {position}")]
    Malformed { position: usize },
}

/// The single "resolution failed" signal a provider hands to the orchestrator
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Unexpected payload: {0}")]
    Layout(String),

    #[error("Bad value: {0}")]
    Value(#[from] ValueError),

    #[error("Descriptor invalid: {0}")]
    Descriptor(String),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl ResolveError {
    pub fn layout(what: impl Into<String>) -> Self {
        ResolveError::Layout(what.into())
    }
}

/// Weather scraping errors
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Forecast table missing: found {found} cells, need 3")]
    Layout { found: usize },

    #[error("Forecast cells are empty")]
    NoForecast,

    #[error("Weather line could not be rendered: {0}")]
    Format(#[from] FormatError),
}

pub type ProviderResult<T> = Result<T, ResolveError>;

//! Shop-Harvest: a catalog extraction pipeline
//!
//! This crate crawls a paginated product listing, fetches the machine-readable
//! variant feed of every product it finds and hands the flattened records to a
//! batch sink (JSON files and a SQLite table).

pub mod config;
pub mod crawler;
pub mod output;

use std::fmt;
use thiserror::Error;

/// Main error type for Shop-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Page numbers start at 1, got {0}")]
    InvalidPageNumber(u32),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The URL was empty; the request was never sent
    InvalidUrl,
    /// The server answered with a non-2xx status
    Status(u16),
    /// The request timed out
    Timeout,
    /// DNS, refused or reset connection
    Connect,
    /// The response body could not be read
    Body,
    /// Anything reqwest could not classify further
    Other,
}

impl FetchErrorKind {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect | Self::Body => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::InvalidUrl | Self::Other => false,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => write!(f, "invalid url"),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connection failure"),
            Self::Body => write!(f, "body read failure"),
            Self::Other => write!(f, "request failure"),
        }
    }
}

/// A failed fetch, carrying enough detail to log and classify it
#[derive(Debug, Clone, Error)]
#[error("{kind} for '{url}': {detail}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, kind: FetchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            detail: detail.into(),
        }
    }

    /// True when the call itself was invalid rather than the network failing
    pub fn is_precondition(&self) -> bool {
        self.kind == FetchErrorKind::InvalidUrl
    }
}

/// Result type alias for Shop-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::SiteConfig;
pub use crawler::{Fetcher, Pipeline, VariantRecord};

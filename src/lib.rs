//! Docatlas: a resumable documentation-site crawler
//!
//! This crate crawls a documentation website with a bounded pool of async
//! workers, extracts structured page records (title, breadcrumbs, excerpt,
//! navigation links), and checkpoints every record to an append-only log so
//! an interrupted crawl can resume with minimal loss. The accumulated
//! records are compacted into a single JSON snapshot consumed by downstream
//! tree-building and visualization tools.

pub mod config;
pub mod crawler;
pub mod page;
pub mod store;
pub mod url;

use thiserror::Error;

/// Main error type for docatlas operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Extraction failed for {url}: {message}")]
    Extract { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid page record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Fetch failures, produced after the retry budget is exhausted
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },
}

impl FetchError {
    /// The URL the failed request targeted
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Timeout { url } | Self::Transport { url, .. } => url,
        }
    }
}

/// Result type alias for docatlas operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlSession, CrawlSummary, RunOptions};
pub use page::{FrontierItem, PageRecord};
pub use url::normalize;

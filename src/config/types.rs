use serde::Deserialize;

/// Main configuration structure for docatlas
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URL the crawl starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Host a URL must match exactly to be in scope
    #[serde(rename = "base-domain")]
    pub base_domain: String,

    /// Maximum number of fetch/extract pipelines in flight
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Page budget; the crawl stops claiming work once this many URLs
    /// have been visited
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Fetch attempts per URL before the item is dropped
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-attempt request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Optional path-prefix scope rules. Empty means whole-domain; when
    /// non-empty a URL's path must start with one of these prefixes.
    #[serde(rename = "path-prefixes", default)]
    pub path_prefixes: Vec<String>,
}

/// Output and checkpointing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the final JSON snapshot (an array of page records)
    #[serde(rename = "snapshot-path")]
    pub snapshot_path: String,

    /// Path of the append-only NDJSON checkpoint log
    #[serde(rename = "log-path")]
    pub log_path: String,

    /// Compact the snapshot after this many new records
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: u32,
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_max_pages() -> u32 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_checkpoint_interval() -> u32 {
    25
}

fn default_user_agent() -> String {
    format!(
        "docatlas/{} (documentation structure mapper)",
        env!("CARGO_PKG_VERSION")
    )
}

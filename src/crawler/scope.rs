//! Crawl scope rules
//!
//! The scope guard is consulted twice per URL: before the fetch, to avoid
//! spending a network round trip on URLs that can never produce a record,
//! and after the fetch, to discard non-HTML responses. Out-of-scope URLs
//! are expected and frequent, so rejections are not errors.

use crate::config::CrawlConfig;
use url::Url;

/// Path suffixes that mark binary/asset URLs, skipped before fetching
const BLOCKED_EXTENSIONS: &[&str] = &[
    ".pdf", ".png", ".jpg", ".jpeg", ".gif", ".css", ".js", ".json", ".xml", ".txt", ".zip",
    ".tar", ".gz", ".bmp", ".ico",
];

/// Decides whether a candidate URL is eligible to be queued and fetched
#[derive(Debug, Clone)]
pub struct ScopeGuard {
    base_domain: String,
    path_prefixes: Vec<String>,
}

impl ScopeGuard {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            base_domain: config.base_domain.clone(),
            path_prefixes: config.path_prefixes.clone(),
        }
    }

    /// Pre-fetch eligibility check
    ///
    /// A URL is in scope when all of the following hold:
    /// 1. It parses as a URL
    /// 2. Its scheme is http or https
    /// 3. Its host equals the base domain exactly (no subdomains)
    /// 4. Its path does not end in a known non-document extension
    /// 5. If path prefixes are configured, its path starts with one of them
    pub fn is_in_scope(&self, url: &str) -> bool {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => return false,
        };

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return false;
        }

        if parsed.host_str() != Some(self.base_domain.as_str()) {
            return false;
        }

        let path = parsed.path().to_lowercase();
        if BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            return false;
        }

        if !self.path_prefixes.is_empty()
            && !self
                .path_prefixes
                .iter()
                .any(|prefix| parsed.path().starts_with(prefix.as_str()))
        {
            return false;
        }

        true
    }

    /// Post-fetch check: only HTML responses become records
    pub fn is_html_content_type(content_type: &str) -> bool {
        content_type.to_ascii_lowercase().contains("text/html")
    }
}

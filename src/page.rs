//! Core page data model
//!
//! `PageRecord` is the unit of truth the crawler produces: one record per
//! successfully extracted page, immutable once appended to the store (the
//! only exception is the explicit targeted-refresh flow, which deletes and
//! re-inserts). `FrontierItem` is a pending unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CrawlError;

/// One crawled documentation page, as persisted in the snapshot and the
/// checkpoint log. Wire field names are camelCase to match the dataset
/// contract consumed by the downstream tree builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Canonical (normalized) URL; unique key across the result store
    pub url: String,

    /// Page title; never empty in persisted output
    pub title: String,

    /// Ordered breadcrumb trail labels, "Home" excluded
    #[serde(default)]
    pub breadcrumbs: Vec<String>,

    /// Bounded text excerpt of the page body
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,

    /// URL of the page that discovered this one (provenance only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,

    /// Auxiliary cross-reference URLs found on the page; not necessarily
    /// crawled themselves
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_urls: Vec<String>,

    /// Extraction timestamp (ISO-8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scraped: Option<DateTime<Utc>>,
}

impl PageRecord {
    /// Creates a record, enforcing the required-field invariants: `url`
    /// and `title` must be non-empty.
    pub fn new(url: String, title: String) -> Result<Self, CrawlError> {
        if url.trim().is_empty() {
            return Err(CrawlError::InvalidRecord(
                "page record url cannot be empty".to_string(),
            ));
        }
        if title.trim().is_empty() {
            return Err(CrawlError::InvalidRecord(format!(
                "page record for {url} has an empty title"
            )));
        }

        Ok(Self {
            url,
            title,
            breadcrumbs: Vec::new(),
            content: String::new(),
            parent_url: None,
            related_urls: Vec::new(),
            last_scraped: Some(Utc::now()),
        })
    }
}

/// A pending unit of crawl work. The URL is raw (pre-normalization); the
/// frontier normalizes it at claim time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    /// The URL to fetch
    pub url: String,

    /// The page that linked to this one, if any
    pub parent_url: Option<String>,
}

impl FrontierItem {
    /// A root item with no discovering parent (start or refresh target)
    pub fn root(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_url: None,
        }
    }

    /// An item discovered on another page
    pub fn child(url: impl Into<String>, parent_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parent_url: Some(parent_url.into()),
        }
    }
}

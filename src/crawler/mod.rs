//! Crawl engine: fetching, scope rules, extraction, frontier, scheduling

pub mod extract;
pub mod fetcher;
pub mod frontier;
pub mod scope;
pub mod session;

pub use extract::{Extract, ExtractedPage, HtmlExtractor};
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use frontier::Frontier;
pub use scope::ScopeGuard;
pub use session::{CrawlSession, CrawlSummary, RunOptions};

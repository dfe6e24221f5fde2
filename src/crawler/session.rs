//! Crawl session and worker-pool scheduler
//!
//! A `CrawlSession` owns all mutable crawl state for one run: the
//! frontier, the result store, and the checkpointer. Nothing is
//! module-level, so tests get fresh state per case and runs never leak
//! into each other.
//!
//! The scheduler is a fixed pool of logical workers. Each worker loops:
//! claim the next frontier item (dequeue + visited insertion is one
//! synchronous step under the state lock, so two workers can never race
//! on a URL), run the fetch → scope → extract pipeline, durably log the
//! record, then publish it and its discovered links back into the shared
//! state. A worker exits when the page budget is reached, or when the
//! queue is empty and no other worker is mid-item; an empty queue with
//! work still in flight is a short poll-and-retry wait.
//!
//! The state lock is never held across an await point.

use crate::config::Config;
use crate::crawler::extract::{Extract, HtmlExtractor};
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::frontier::{Claim, Frontier};
use crate::crawler::scope::ScopeGuard;
use crate::page::{FrontierItem, PageRecord};
use crate::store::{Checkpointer, ResultStore};
use crate::url::normalize;
use crate::{CrawlError, Result};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// How long an idle worker waits before re-checking the queue
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Progress is reported every this many successful pages
const PROGRESS_INTERVAL: usize = 10;

/// How a run is started
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore any existing snapshot/log and start clean
    pub fresh: bool,

    /// Re-crawl exactly this URL, replacing its existing record
    pub refresh_url: Option<String>,
}

/// Totals reported when a run finishes
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Records produced by this run
    pub pages_crawled: usize,

    /// Items dropped after fetch/extract failures
    pub pages_failed: usize,

    /// Size of the visited set at the end of the run
    pub visited: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Mutable crawl state, owned by the session and touched only in
/// synchronous steps under the lock
struct Shared {
    frontier: Frontier,
    store: ResultStore,
    in_flight: usize,
    crawled: usize,
    failed: usize,
    new_since_compaction: u32,
}

/// One crawl run: configuration, HTTP client, extraction step, and the
/// shared state behind its locks. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CrawlSession {
    config: Arc<Config>,
    client: Client,
    scope: ScopeGuard,
    extractor: Arc<dyn Extract>,
    state: Arc<Mutex<Shared>>,
    // Serializes log appends and compactions; the final compaction and any
    // concurrent periodic/second-signal save wait on this same guard.
    checkpoint: Arc<tokio::sync::Mutex<Checkpointer>>,
    shutdown: Arc<AtomicBool>,
    started: Instant,
}

impl CrawlSession {
    /// Creates a session with the built-in HTML extractor
    pub fn new(config: Config, options: RunOptions) -> Result<Self> {
        Self::with_extractor(config, options, Arc::new(HtmlExtractor))
    }

    /// Creates a session with a custom extraction step
    ///
    /// Recovers prior state from the snapshot and checkpoint log (unless
    /// `fresh`), compacts immediately so the run starts from a clean
    /// single-snapshot state, and seeds the frontier. Errors here are
    /// fatal; nothing has been fetched yet.
    pub fn with_extractor(
        config: Config,
        options: RunOptions,
        extractor: Arc<dyn Extract>,
    ) -> Result<Self> {
        let client = build_http_client(&config.crawl)?;
        let scope = ScopeGuard::new(&config.crawl);

        let mut checkpointer =
            Checkpointer::new(&config.output.snapshot_path, &config.output.log_path)?;

        let mut store = if options.fresh {
            tracing::info!("Starting fresh; ignoring any existing snapshot and log");
            ResultStore::new()
        } else {
            checkpointer.recover()
        };
        if !store.is_empty() {
            tracing::info!("Recovered {} record(s) from previous runs", store.len());
        }

        let mut frontier = Frontier::new();
        for record in store.iter() {
            frontier.mark_visited(&record.url);
        }

        match &options.refresh_url {
            Some(target) => {
                // Targeted refresh: drop the stale record and its dedup
                // entries so exactly one replacement gets crawled.
                let normalized = normalize(target);
                if store.remove(&normalized).is_some() {
                    tracing::info!("Refreshing {normalized}; existing record removed");
                } else {
                    tracing::info!("Refreshing {normalized}; no existing record");
                }
                frontier.forget(&normalized);
                frontier.push(FrontierItem::root(target.clone()));
            }
            None => {
                frontier.push(FrontierItem::root(config.crawl.start_url.clone()));
                // The log does not persist the frontier, so a resumed run
                // re-derives candidate work from recovered cross references.
                for record in store.iter() {
                    for link in &record.related_urls {
                        if scope.is_in_scope(&normalize(link)) {
                            frontier.push(FrontierItem::child(link.clone(), record.url.clone()));
                        }
                    }
                }
            }
        }

        // Fold whatever was recovered into a clean snapshot + empty log
        // before any new work happens.
        checkpointer.compact(&store.to_records())?;

        Ok(Self {
            config: Arc::new(config),
            client,
            scope,
            extractor,
            state: Arc::new(Mutex::new(Shared {
                frontier,
                store,
                in_flight: 0,
                crawled: 0,
                failed: 0,
                new_since_compaction: 0,
            })),
            checkpoint: Arc::new(tokio::sync::Mutex::new(checkpointer)),
            shutdown: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
        })
    }

    /// Flag that stops workers from claiming new items when set. Safe to
    /// set from a signal handler task; in-flight fetches finish and are
    /// recorded before the session compacts and returns.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Runs the crawl to completion: budget reached, frontier exhausted,
    /// or shutdown requested. Always finishes with a compaction.
    pub async fn run(&self) -> Result<CrawlSummary> {
        tracing::info!(
            "Starting crawl of {} ({} workers, budget {} pages)",
            self.config.crawl.start_url,
            self.config.crawl.max_concurrency,
            self.config.crawl.max_pages
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.crawl.max_concurrency {
            let session = self.clone();
            workers.spawn(async move { session.worker_loop(worker_id).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {e}");
            }
        }

        // Final compaction, serialized with any still-running periodic
        // save. Checkpoint lock first, state snapshot second, matching
        // the worker ordering.
        {
            let mut checkpointer = self.checkpoint.lock().await;
            let records = {
                let shared = self.state.lock().expect("state lock poisoned");
                shared.store.to_records()
            };
            if let Err(e) = checkpointer.compact(&records) {
                // Snapshot + log together still hold every record; the
                // next startup replays the log
                tracing::error!("Final compaction failed: {e}");
            }
        }

        let summary = {
            let shared = self.state.lock().expect("state lock poisoned");
            CrawlSummary {
                pages_crawled: shared.crawled,
                pages_failed: shared.failed,
                visited: shared.frontier.visited_len(),
                elapsed: self.started.elapsed(),
            }
        };

        if self.shutdown.load(Ordering::SeqCst) {
            tracing::info!(
                "Crawl stopped on shutdown signal: {} page(s) in {:.1?}",
                summary.pages_crawled,
                summary.elapsed
            );
        } else {
            let rate = summary.pages_crawled as f64 / summary.elapsed.as_secs_f64().max(0.001);
            tracing::info!(
                "Crawl completed: {} page(s), {} failed, {} visited in {:.1?} ({:.2} pages/sec)",
                summary.pages_crawled,
                summary.pages_failed,
                summary.visited,
                summary.elapsed,
                rate
            );
        }

        Ok(summary)
    }

    /// One worker's claim-process loop
    async fn worker_loop(&self, worker_id: u32) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::debug!("Worker {worker_id} stopping on shutdown signal");
                return;
            }

            let next = {
                let mut shared = self.state.lock().expect("state lock poisoned");
                if shared.frontier.visited_len() >= self.config.crawl.max_pages as usize {
                    tracing::debug!("Worker {worker_id} stopping: page budget reached");
                    return;
                }
                match shared.frontier.claim_next() {
                    Claim::Item(item, normalized) => {
                        shared.in_flight += 1;
                        Some((item, normalized))
                    }
                    Claim::Empty => {
                        if shared.in_flight == 0 {
                            tracing::debug!("Worker {worker_id} stopping: frontier exhausted");
                            return;
                        }
                        None
                    }
                }
            };

            let Some((item, normalized)) = next else {
                // Queue is empty but another worker may still discover links
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            };

            self.handle_item(item, normalized).await;
        }
    }

    /// Processes one claimed item and publishes its results
    async fn handle_item(&self, item: FrontierItem, normalized: String) {
        let outcome = self.process_item(&item, &normalized).await;

        match outcome {
            Ok(Some((record, links))) => {
                // The log append and the in-memory insert form one critical
                // section under the checkpoint lock. A concurrent compaction
                // also holds that lock while it reads the store, so it can
                // never truncate a logged record that its snapshot lacks.
                let mut checkpointer = self.checkpoint.lock().await;

                // Durably log before acknowledging the record in memory; an
                // append failure is logged but does not stop the crawl (the
                // next successful compaction persists the record anyway).
                if let Err(e) = checkpointer.append(&record) {
                    tracing::warn!("Checkpoint append failed for {}: {e}", record.url);
                }

                let compaction = {
                    let mut shared = self.state.lock().expect("state lock poisoned");
                    shared.in_flight -= 1;
                    shared.store.insert(record);
                    shared.crawled += 1;
                    shared.new_since_compaction += 1;

                    for link in &links {
                        if self.scope.is_in_scope(&normalize(link)) {
                            shared
                                .frontier
                                .push(FrontierItem::child(link.clone(), normalized.clone()));
                        }
                    }

                    if shared.crawled % PROGRESS_INTERVAL == 0 {
                        let rate = shared.crawled as f64 / self.started.elapsed().as_secs_f64();
                        tracing::info!(
                            "Progress: {} crawled, {} queued, {} visited, {:.2} pages/sec",
                            shared.crawled,
                            shared.frontier.len(),
                            shared.frontier.visited_len(),
                            rate
                        );
                    }

                    if shared.new_since_compaction >= self.config.output.checkpoint_interval {
                        shared.new_since_compaction = 0;
                        Some(shared.store.to_records())
                    } else {
                        None
                    }
                };

                if let Some(records) = compaction {
                    if let Err(e) = checkpointer.compact(&records) {
                        // Store stays intact in memory; a later compaction retries
                        tracing::warn!("Periodic compaction failed: {e}");
                    }
                }
            }
            Ok(None) => {
                // Out of scope or non-HTML: expected, not an error
                let mut shared = self.state.lock().expect("state lock poisoned");
                shared.in_flight -= 1;
            }
            Err(e) => {
                tracing::warn!("Dropping {}: {e}", item.url);
                let mut shared = self.state.lock().expect("state lock poisoned");
                shared.in_flight -= 1;
                shared.failed += 1;
            }
        }
    }

    /// The fetch → scope → extract pipeline for one URL. Returns
    /// `Ok(None)` for expected skips, `Err` for failures that drop the
    /// item; neither escalates past the worker.
    async fn process_item(
        &self,
        item: &FrontierItem,
        normalized: &str,
    ) -> Result<Option<(PageRecord, Vec<String>)>> {
        if !self.scope.is_in_scope(normalized) {
            tracing::trace!("Out of scope: {normalized}");
            return Ok(None);
        }

        tracing::debug!("Fetching {normalized}");
        let fetched = fetch_page(&self.client, normalized, self.config.crawl.max_retries).await?;

        // Redirects can land outside the configured scope
        let final_normalized = normalize(&fetched.final_url);
        if final_normalized != normalized && !self.scope.is_in_scope(&final_normalized) {
            tracing::debug!("Skipping {normalized}: redirected out of scope to {final_normalized}");
            return Ok(None);
        }

        if !ScopeGuard::is_html_content_type(&fetched.content_type) {
            tracing::debug!(
                "Skipping {normalized}: content-type '{}' is not HTML",
                fetched.content_type
            );
            return Ok(None);
        }

        // In-scope URLs always parsed once already
        let page_url = Url::parse(normalized)?;
        let extracted = self
            .extractor
            .extract(&fetched.body, &page_url)
            .map_err(|e| CrawlError::Extract {
                url: normalized.to_string(),
                message: e.to_string(),
            })?;

        let mut record = PageRecord::new(normalized.to_string(), extracted.title)?;
        record.breadcrumbs = extracted.breadcrumbs;
        record.content = extracted.content;
        record.parent_url = item.parent_url.as_deref().map(normalize);
        record.related_urls = extracted.related_urls;

        Ok(Some((record, extracted.outgoing_links)))
    }
}

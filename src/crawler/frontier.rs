//! Crawl frontier: FIFO work queue plus the queued and visited sets
//!
//! The frontier owns the three pieces of dedup state a crawl needs:
//! the pending queue (breadth-first order), the queued set (prevents the
//! same discovered URL being enqueued twice before it is claimed), and the
//! visited set (a URL is claimed at most once, ever). `claim_next` performs
//! dequeue + visited insertion as one synchronous step; callers hold the
//! session lock for its duration and there is no await point inside, so two
//! workers can never race on the same URL.

use crate::page::FrontierItem;
use crate::url::normalize;
use std::collections::{HashSet, VecDeque};

/// Outcome of a claim attempt
#[derive(Debug)]
pub enum Claim {
    /// An item was claimed; its normalized URL is now in the visited set
    Item(FrontierItem, String),

    /// The queue is empty (other workers may still be mid-item)
    Empty,
}

/// The discovered-but-not-yet-fetched URL queue with its dedup sets
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierItem>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an item unless its normalized URL is already queued or
    /// already visited. Returns true if the item was accepted.
    pub fn push(&mut self, item: FrontierItem) -> bool {
        let normalized = normalize(&item.url);
        if self.visited.contains(&normalized) || !self.queued.insert(normalized) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Claims the next unvisited item, moving its URL into the visited set
    ///
    /// Items whose normalized URL turned out to be visited while they sat
    /// in the queue are skipped and discarded here.
    pub fn claim_next(&mut self) -> Claim {
        while let Some(item) = self.queue.pop_front() {
            let normalized = normalize(&item.url);
            self.queued.remove(&normalized);
            if self.visited.insert(normalized.clone()) {
                return Claim::Item(item, normalized);
            }
        }
        Claim::Empty
    }

    /// Marks a URL visited without queueing it (used when seeding the
    /// visited set from recovered records)
    pub fn mark_visited(&mut self, normalized_url: &str) {
        self.visited.insert(normalized_url.to_string());
    }

    /// Forgets a URL entirely so it can be re-claimed (targeted refresh)
    pub fn forget(&mut self, normalized_url: &str) {
        self.visited.remove(normalized_url);
        self.queued.remove(normalized_url);
        self.queue.retain(|item| normalize(&item.url) != normalized_url);
    }

    pub fn is_visited(&self, normalized_url: &str) -> bool {
        self.visited.contains(normalized_url)
    }

    /// Number of URLs ever claimed (the page-budget counter)
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Number of pending items in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> FrontierItem {
        FrontierItem::root(url)
    }

    #[test]
    fn test_push_and_claim_fifo_order() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(item("https://example.com/a")));
        assert!(frontier.push(item("https://example.com/b")));

        let Claim::Item(first, _) = frontier.claim_next() else {
            panic!("expected an item");
        };
        assert_eq!(first.url, "https://example.com/a");

        let Claim::Item(second, _) = frontier.claim_next() else {
            panic!("expected an item");
        };
        assert_eq!(second.url, "https://example.com/b");

        assert!(matches!(frontier.claim_next(), Claim::Empty));
    }

    #[test]
    fn test_duplicate_enqueue_rejected_while_queued() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(item("https://example.com/a")));
        // second discovery of the same page from another parent
        assert!(!frontier.push(FrontierItem::child(
            "https://example.com/a",
            "https://example.com/parent"
        )));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn test_normalization_is_the_identity_for_dedup() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(item("https://example.com/a")));
        assert!(!frontier.push(item("https://example.com/a#section")));
        assert!(!frontier.push(item("HTTPS://EXAMPLE.COM/a?q=1")));
    }

    #[test]
    fn test_claim_inserts_into_visited() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a"));

        let Claim::Item(_, normalized) = frontier.claim_next() else {
            panic!("expected an item");
        };
        assert!(frontier.is_visited(&normalized));
        assert_eq!(frontier.visited_len(), 1);

        // once visited, the URL can never be queued again
        assert!(!frontier.push(item("https://example.com/a")));
    }

    #[test]
    fn test_claim_skips_items_visited_while_queued() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a"));
        frontier.mark_visited("https://example.com/a");

        assert!(matches!(frontier.claim_next(), Claim::Empty));
        // mark_visited + the skipped claim leave exactly one visited entry
        assert_eq!(frontier.visited_len(), 1);
    }

    #[test]
    fn test_forget_allows_reclaim() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a"));
        let Claim::Item(_, normalized) = frontier.claim_next() else {
            panic!("expected an item");
        };

        frontier.forget(&normalized);
        assert!(!frontier.is_visited(&normalized));

        assert!(frontier.push(item("https://example.com/a")));
        assert!(matches!(frontier.claim_next(), Claim::Item(_, _)));
    }

    #[test]
    fn test_forget_removes_pending_queue_entry() {
        let mut frontier = Frontier::new();
        frontier.push(item("https://example.com/a"));
        frontier.push(item("https://example.com/b"));

        frontier.forget("https://example.com/a");
        assert_eq!(frontier.len(), 1);

        let Claim::Item(next, _) = frontier.claim_next() else {
            panic!("expected an item");
        };
        assert_eq!(next.url, "https://example.com/b");
    }
}

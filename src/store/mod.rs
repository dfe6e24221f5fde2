//! In-memory result store
//!
//! The ordered collection of page records produced by the crawl; this is
//! the unit of truth that gets serialized. Records are keyed by canonical
//! URL through an explicit index side-table, and a record is immutable once
//! inserted except for last-write-wins replacement (log replay) and the
//! targeted-refresh delete.

pub mod checkpoint;

pub use checkpoint::Checkpointer;

use crate::page::PageRecord;
use std::collections::HashMap;

/// Ordered page records with a canonical-URL index
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Vec<Option<PageRecord>>,
    index: HashMap<String, usize>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any existing record with the same URL
    /// in place (last-write-wins). Returns true if the URL was new.
    pub fn insert(&mut self, record: PageRecord) -> bool {
        match self.index.get(&record.url) {
            Some(&slot) => {
                self.records[slot] = Some(record);
                false
            }
            None => {
                self.index.insert(record.url.clone(), self.records.len());
                self.records.push(Some(record));
                true
            }
        }
    }

    /// Removes the record for a URL, if present (targeted refresh)
    pub fn remove(&mut self, url: &str) -> Option<PageRecord> {
        let slot = self.index.remove(url)?;
        self.records[slot].take()
    }

    pub fn get(&self, url: &str) -> Option<&PageRecord> {
        self.index
            .get(url)
            .and_then(|&slot| self.records[slot].as_ref())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Records in insertion order, as written to the snapshot
    pub fn to_records(&self) -> Vec<PageRecord> {
        self.records.iter().flatten().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageRecord> {
        self.records.iter().flatten()
    }
}

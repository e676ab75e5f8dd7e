//! In-memory document store
//!
//! Keeps collections in ordered maps so pagination is stable, upserts by id
//! like a real store, and records every commit and query window. Faults can
//! be injected to exercise the abort and retry paths of the pipeline.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::{ConnectionError, Result, SyncError};

use super::{BulkResponse, DocumentStore, QueryPage};

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, BTreeMap<String, Value>>,
    /// Ids of every accepted batch, in commit order
    commits: Vec<Vec<String>>,
    /// Number of bulk writes attempted, accepted or not
    commit_attempts: usize,
    /// 1-based attempt number to reject
    reject_commit: Option<usize>,
    /// (offset, limit) of every query attempt
    queries: Vec<(u64, u64)>,
    /// Number of upcoming queries to fail
    failing_queries: u32,
    /// Documents inserted right after the next successful query
    pending_growth: Vec<Document>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `docs` in `index`
    pub fn with_documents(index: &str, docs: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            let coll = state.collections.entry(index.to_string()).or_default();
            for doc in docs {
                coll.insert(doc.id, doc.payload);
            }
        }
        store
    }

    /// Reject the `attempt`-th bulk write (1-based) without applying it
    pub fn reject_commit(&self, attempt: usize) {
        self.lock().reject_commit = Some(attempt);
    }

    /// Fail the next `count` queries
    pub fn fail_queries(&self, count: u32) {
        self.lock().failing_queries = count;
    }

    /// Insert `docs` into `index` right after the next successful query
    pub fn grow_after_next_query(&self, docs: impl IntoIterator<Item = Document>) {
        self.lock().pending_growth.extend(docs);
    }

    /// Ids of each accepted batch, in commit order
    pub fn commits(&self) -> Vec<Vec<String>> {
        self.lock().commits.clone()
    }

    /// Number of bulk writes attempted
    pub fn commit_attempts(&self) -> usize {
        self.lock().commit_attempts
    }

    /// Query windows requested so far, failed attempts included
    pub fn queries(&self) -> Vec<(u64, u64)> {
        self.lock().queries.clone()
    }

    /// Snapshot of a collection, ordered by id
    pub fn documents(&self, index: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(index)
            .map(|coll| {
                coll.iter()
                    .map(|(id, payload)| Document::new(id.clone(), payload.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock only happens in a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn bulk_write(&self, index: &str, docs: &[Document]) -> Result<BulkResponse> {
        let mut state = self.lock();
        state.commit_attempts += 1;

        let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
        if state.reject_commit == Some(state.commit_attempts) {
            debug!("Rejecting bulk write #{} ({} documents)", state.commit_attempts, docs.len());
            return Ok(BulkResponse::rejected(ids));
        }

        let coll = state.collections.entry(index.to_string()).or_default();
        for doc in docs {
            coll.insert(doc.id.clone(), doc.payload.clone());
        }
        state.commits.push(ids);
        Ok(BulkResponse::accepted())
    }

    async fn query(&self, index: &str, offset: u64, limit: u64) -> Result<QueryPage> {
        let mut state = self.lock();
        state.queries.push((offset, limit));

        if state.failing_queries > 0 {
            state.failing_queries -= 1;
            return Err(SyncError::Connection(ConnectionError::ConnectionFailed(
                "simulated outage".to_string(),
            )));
        }

        let page = match state.collections.get(index) {
            Some(coll) => QueryPage {
                documents: coll
                    .iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .map(|(id, payload)| Document::new(id.clone(), payload.clone()))
                    .collect(),
                total: coll.len() as u64,
            },
            None => QueryPage::default(),
        };

        if !state.pending_growth.is_empty() {
            let growth = std::mem::take(&mut state.pending_growth);
            let coll = state.collections.entry(index.to_string()).or_default();
            for doc in growth {
                coll.insert(doc.id, doc.payload);
            }
        }

        Ok(page)
    }
}

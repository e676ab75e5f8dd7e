//! Bulk submitter, the consumer side of the push pipeline
//!
//! Takes documents from the hand-off channel, fills the current batch and
//! commits it whenever it is full. When the scanner is done the remaining
//! partial batch is committed once. Any failed or rejected commit aborts
//! the run; nothing is retried.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::document::Document;
use crate::error::{CommitError, Result, SyncError};
use crate::store::DocumentStore;

use super::batch::BatchAccumulator;
use super::handoff::HandoffReceiver;
use super::progress::ProgressTracker;

/// Counters of a finished submitter run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitStats {
    /// Documents committed
    pub documents: u64,
    /// Batches committed
    pub batches: u64,
}

/// Consumer side of the push pipeline
pub struct BulkSubmitter {
    store: Arc<dyn DocumentStore>,
    index: String,
    batch: BatchAccumulator,
    progress: Arc<ProgressTracker>,
    stats: SubmitStats,
}

impl BulkSubmitter {
    /// Create a submitter
    ///
    /// # Arguments
    /// * `store` - Store receiving the batches
    /// * `index` - Target index or collection
    /// * `bulk_size` - Maximum documents per commit
    /// * `progress` - Shared progress counters
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: impl Into<String>,
        bulk_size: usize,
        progress: Arc<ProgressTracker>,
    ) -> Self {
        Self {
            store,
            index: index.into(),
            batch: BatchAccumulator::new(bulk_size),
            progress,
            stats: SubmitStats::default(),
        }
    }

    /// Drain `rx` into the store
    ///
    /// Returns `SyncError::Cancelled` without committing the pending batch
    /// if `cancel` fires first.
    pub async fn run(
        mut self,
        mut rx: HandoffReceiver<Document>,
        cancel: &CancellationToken,
    ) -> Result<SubmitStats> {
        loop {
            let doc = match rx.recv(cancel).await {
                Ok(Some(doc)) => doc,
                Ok(None) => break,
                Err(_) => return Err(SyncError::Cancelled),
            };

            self.batch.push(doc);
            self.progress.record();

            if let Some(docs) = self.batch.flush_if_full() {
                self.commit(docs, cancel).await?;
            }
        }

        // A closed channel after a scanner failure is not exhaustion
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        if let Some(docs) = self.batch.flush_remaining() {
            debug!("Committing final batch of {} documents", docs.len());
            self.commit(docs, cancel).await?;
        }

        Ok(self.stats)
    }

    /// Commit one batch as a single request
    async fn commit(&mut self, docs: Vec<Document>, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let size = docs.len();
        debug!("Committing batch #{} ({} documents)", self.stats.batches + 1, size);

        let response = self
            .store
            .bulk_write(&self.index, &docs)
            .await
            .map_err(|e| match e {
                SyncError::Commit(c) => SyncError::Commit(c),
                other => CommitError::Transport(other.to_string()).into(),
            })?;

        if !response.is_accepted() {
            error!(
                "Bulk commit to '{}' rejected ({} of {} documents)",
                self.index,
                response.rejected_ids.len(),
                size
            );
            return Err(CommitError::Rejected {
                batch_size: size,
                rejected_ids: response.rejected_ids,
                reason: response.batch_error,
            }
            .into());
        }

        self.stats.batches += 1;
        self.stats.documents += size as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transfer::handoff::handoff;
    use serde_json::json;

    fn docs(ids: &[&str]) -> Vec<Document> {
        ids.iter().map(|id| Document::new(*id, json!({ "id": id }))).collect()
    }

    async fn feed(
        store: Arc<MemoryStore>,
        bulk_size: usize,
        input: Vec<Document>,
    ) -> Result<SubmitStats> {
        let (tx, rx) = handoff();
        let token = CancellationToken::new();
        let progress = Arc::new(ProgressTracker::new(false));
        let submitter = BulkSubmitter::new(store, "idx", bulk_size, progress);

        let producer_token = token.clone();
        let producer = tokio::spawn(async move {
            for doc in input {
                tx.send(doc, &producer_token).await.unwrap();
            }
        });

        let result = submitter.run(rx, &token).await;
        producer.await.unwrap();
        result
    }

    #[tokio::test]
    async fn test_batches_respect_bulk_size() {
        let store = Arc::new(MemoryStore::new());
        let stats = feed(store.clone(), 2, docs(&["a", "b", "c", "d", "e"]))
            .await
            .unwrap();

        assert_eq!(stats, SubmitStats { documents: 5, batches: 3 });
        let sizes: Vec<_> = store.commits().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_final_commit() {
        let store = Arc::new(MemoryStore::new());
        feed(store.clone(), 2, docs(&["a", "b"])).await.unwrap();
        assert_eq!(store.commit_attempts(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_commits_nothing() {
        let store = Arc::new(MemoryStore::new());
        let stats = feed(store.clone(), 10, Vec::new()).await.unwrap();
        assert_eq!(stats, SubmitStats::default());
        assert_eq!(store.commit_attempts(), 0);
    }

    #[tokio::test]
    async fn test_rejection_aborts() {
        let store = Arc::new(MemoryStore::new());
        store.reject_commit(1);

        let (tx, rx) = handoff();
        let token = CancellationToken::new();
        let submitter = BulkSubmitter::new(
            store.clone(),
            "idx",
            1,
            Arc::new(ProgressTracker::new(false)),
        );

        let producer_token = token.clone();
        let producer = tokio::spawn(async move {
            for doc in docs(&["a", "b", "c"]) {
                if tx.send(doc, &producer_token).await.is_err() {
                    break;
                }
            }
        });

        let result = submitter.run(rx, &token).await;
        token.cancel();
        producer.await.unwrap();

        assert!(matches!(
            result,
            Err(SyncError::Commit(CommitError::Rejected { batch_size: 1, .. }))
        ));
        assert_eq!(store.commit_attempts(), 1);
        assert!(store.commits().is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_drops_pending_batch() {
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = handoff();
        let token = CancellationToken::new();
        let submitter = BulkSubmitter::new(
            store.clone(),
            "idx",
            10,
            Arc::new(ProgressTracker::new(false)),
        );

        let producer_token = token.clone();
        let producer = tokio::spawn(async move {
            for doc in docs(&["a", "b"]) {
                tx.send(doc, &producer_token).await.unwrap();
            }
            // Simulate a scanner failure: cancel while still holding the sender
            producer_token.cancel();
            drop(tx);
        });

        let result = submitter.run(rx, &token).await;
        producer.await.unwrap();

        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert_eq!(store.commit_attempts(), 0);
    }
}

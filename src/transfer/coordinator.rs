//! Push coordinator
//!
//! Runs the scanner and the submitter as two tasks joined by a hand-off
//! channel and one cancellation token. Whichever side fails first records
//! its error and cancels the token; the other side notices at its next
//! blocking point. The caller gets the first recorded error once both tasks
//! have exited.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Result, SyncError};
use crate::store::DocumentStore;

use super::handoff::handoff;
use super::progress::ProgressTracker;
use super::scanner::FileScanner;
use super::submitter::{BulkSubmitter, SubmitStats};

/// Result of a push operation
#[derive(Debug, Clone)]
pub struct PushReport {
    /// Documents read from the source directory
    pub documents_scanned: u64,
    /// Documents committed to the store
    pub documents_committed: u64,
    /// Batches committed
    pub batches: u64,
    /// Time taken for the push
    pub elapsed: Duration,
    /// Final `count | rate req/s | mm:ss` line
    pub throughput: String,
}

/// First real failure of a run; cancellation markers are ignored
#[derive(Debug, Default)]
struct FirstError(Mutex<Option<SyncError>>);

impl FirstError {
    fn record(&self, err: SyncError) {
        if err.is_cancelled() {
            return;
        }
        let mut slot = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<SyncError> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// Record a failed side and cancel its sibling
fn settle<T>(result: Result<T>, token: &CancellationToken, first: &FirstError) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            first.record(err);
            token.cancel();
            None
        }
    }
}

fn joined<T>(result: std::result::Result<Option<T>, JoinError>, first: &FirstError) -> Option<T> {
    result.unwrap_or_else(|e| {
        first.record(SyncError::Generic(format!("pipeline task failed: {e}")));
        None
    })
}

/// Coordinator for push operations
pub struct PipelineCoordinator {
    store: Arc<dyn DocumentStore>,
    index: String,
    source: PathBuf,
    bulk_size: usize,
    progress: Arc<ProgressTracker>,
    cancel_token: CancellationToken,
}

impl PipelineCoordinator {
    /// Create a new push coordinator
    ///
    /// # Arguments
    /// * `store` - Store receiving the documents
    /// * `index` - Target index or collection
    /// * `source` - Directory holding the `.json` files
    /// * `bulk_size` - Maximum documents per commit
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: impl Into<String>,
        source: impl Into<PathBuf>,
        bulk_size: usize,
    ) -> Self {
        Self {
            store,
            index: index.into(),
            source: source.into(),
            bulk_size,
            progress: Arc::new(ProgressTracker::new(false)),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Show a spinner with the throughput line while pushing
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.progress = Arc::new(ProgressTracker::new(enabled));
        self
    }

    /// Abort the push when `token` is cancelled
    ///
    /// Internal failures cancel a child of `token`, never `token` itself.
    pub fn with_cancellation(mut self, token: &CancellationToken) -> Self {
        self.cancel_token = token.child_token();
        self
    }

    /// Shared progress counters, readable while the push runs
    pub fn progress(&self) -> Arc<ProgressTracker> {
        self.progress.clone()
    }

    /// Execute the push
    ///
    /// # Returns
    /// * `Result<PushReport>` - Statistics, or the first error of either side
    pub async fn execute(self) -> Result<PushReport> {
        info!(
            "Pushing {} to '{}' in batches of {}",
            self.source.display(),
            self.index,
            self.bulk_size
        );

        let token = self.cancel_token;
        let first = Arc::new(FirstError::default());
        let (tx, rx) = handoff();

        let producer = {
            let token = token.clone();
            let first = first.clone();
            let scanner = FileScanner::new(self.source);
            tokio::spawn(async move {
                let result = scanner.run(&tx, &token).await;
                // Cancel before the sender drops so the consumer cannot
                // mistake a failed scan for an exhausted one
                let outcome = settle(result, &token, &first);
                drop(tx);
                outcome
            })
        };

        let consumer = {
            let token = token.clone();
            let first = first.clone();
            let submitter =
                BulkSubmitter::new(self.store, self.index, self.bulk_size, self.progress.clone());
            tokio::spawn(async move {
                let result = submitter.run(rx, &token).await;
                settle(result, &token, &first)
            })
        };

        let (scanned, submitted) = tokio::join!(producer, consumer);
        let scanned = joined(scanned, &first);
        let submitted = joined(submitted, &first);
        self.progress.finish();

        if let Some(err) = first.take() {
            error!("Push aborted: {}", err);
            return Err(err);
        }

        let (Some(scanned), Some(SubmitStats { documents, batches })) = (scanned, submitted) else {
            info!("Push cancelled after {} documents", self.progress.count());
            return Err(SyncError::Cancelled);
        };

        let report = PushReport {
            documents_scanned: scanned,
            documents_committed: documents,
            batches,
            elapsed: self.progress.elapsed(),
            throughput: self.progress.line(),
        };
        info!(
            "Push completed: {} documents in {} batches, {} ms",
            report.documents_committed,
            report.batches,
            report.elapsed.as_millis()
        );
        Ok(report)
    }
}

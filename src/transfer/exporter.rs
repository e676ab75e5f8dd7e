//! Paginated export of a whole collection to a directory
//!
//! Walks the collection with offset windows of a fixed width, one query in
//! flight at a time. The known total is refreshed from every response, so a
//! collection that grows or shrinks during a long export is still covered.
//! Failed queries are retried at the same offset after a fixed delay; failed
//! writes are logged and skipped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{QueryError, Result, WriteError};
use crate::store::{DocumentStore, QueryPage};

/// Delay between attempts of a failed query
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Offset window state of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationCursor {
    /// Start of the next window
    pub offset: u64,
    /// Width of every window
    pub page_size: u64,
    /// Collection size reported by the latest response
    pub known_total: u64,
}

impl PaginationCursor {
    /// Cursor positioned at the start of the collection
    pub fn new(page_size: u64) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
            known_total: 0,
        }
    }

    /// Take the total of the page just fetched and move to the next window
    ///
    /// # Returns
    /// * `bool` - True when the windows issued so far cover the total
    pub fn advance(&mut self, total: u64) -> bool {
        self.known_total = total;
        self.offset += self.page_size;
        self.is_done()
    }

    /// Whether the windows issued so far cover the known total
    pub fn is_done(&self) -> bool {
        self.offset >= self.known_total
    }
}

/// Result of a pull operation
#[derive(Debug, Clone, Default)]
pub struct PullReport {
    /// Pages fetched
    pub pages: u64,
    /// Files written
    pub documents_written: u64,
    /// Documents that could not be written
    pub documents_skipped: u64,
    /// Failed query attempts that were retried
    pub query_retries: u64,
    /// Collection size reported by the last page
    pub total: u64,
    /// Time taken for the pull
    pub elapsed: Duration,
    /// Whether the pull was cancelled
    pub cancelled: bool,
}

/// Exporter driving the pull direction
pub struct PaginatedExporter {
    store: Arc<dyn DocumentStore>,
    index: String,
    dir: PathBuf,
    page_size: u64,
    retry_delay: Duration,
    max_retries: Option<u32>,
    cancel_token: Option<CancellationToken>,
}

impl PaginatedExporter {
    /// Create a new exporter
    ///
    /// # Arguments
    /// * `store` - Store to read from
    /// * `index` - Source index or collection
    /// * `dir` - Destination directory, created if missing
    /// * `page_size` - Documents per query
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: impl Into<String>,
        dir: impl Into<PathBuf>,
        page_size: u64,
    ) -> Self {
        Self {
            store,
            index: index.into(),
            dir: dir.into(),
            page_size,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retries: None,
            cancel_token: None,
        }
    }

    /// Set the delay between attempts of a failed query
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Give up once `max` retries at one offset have failed as well
    ///
    /// `None` keeps retrying forever.
    pub fn with_max_retries(mut self, max: Option<u32>) -> Self {
        self.max_retries = max;
        self
    }

    /// Set cancellation token for this export
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Execute the export
    ///
    /// # Returns
    /// * `Result<PullReport>` - Statistics; only a missing destination
    ///   directory or exhausted retries end the export with an error
    pub async fn execute(&self) -> Result<PullReport> {
        let start_time = Instant::now();
        tokio::fs::create_dir_all(&self.dir).await?;

        info!(
            "Pulling '{}' into {} in pages of {}",
            self.index,
            self.dir.display(),
            self.page_size
        );

        let mut cursor = PaginationCursor::new(self.page_size);
        let mut report = PullReport::default();

        loop {
            let Some(page) = self.fetch_page(cursor.offset, cursor.page_size, &mut report).await?
            else {
                info!("Pull cancelled at offset {}", cursor.offset);
                report.cancelled = true;
                break;
            };

            debug!(
                "Page at offset {}: {} documents (total: {})",
                cursor.offset,
                page.documents.len(),
                page.total
            );

            for doc in &page.documents {
                match self.write_document(doc).await {
                    Ok(()) => report.documents_written += 1,
                    Err(e) => {
                        warn!("{}; skipping", e);
                        report.documents_skipped += 1;
                    }
                }
            }

            report.pages += 1;
            if cursor.advance(page.total) {
                break;
            }
        }

        report.total = cursor.known_total;
        report.elapsed = start_time.elapsed();

        info!(
            "Pull completed: {} written, {} skipped, {} pages, {} ms",
            report.documents_written,
            report.documents_skipped,
            report.pages,
            report.elapsed.as_millis()
        );
        Ok(report)
    }

    /// Query one window, retrying in place until it succeeds
    ///
    /// Returns `Ok(None)` if cancelled while waiting to retry.
    async fn fetch_page(
        &self,
        offset: u64,
        limit: u64,
        report: &mut PullReport,
    ) -> Result<Option<QueryPage>> {
        let mut attempts = 0u32;

        loop {
            if self.is_cancelled() {
                return Ok(None);
            }

            match self.store.query(&self.index, offset, limit).await {
                Ok(page) => return Ok(Some(page)),
                Err(e) => {
                    attempts += 1;
                    let err = QueryError::Failed {
                        offset,
                        message: e.to_string(),
                    };

                    if self.max_retries.is_some_and(|max| attempts > max) {
                        return Err(QueryError::RetriesExhausted { offset, attempts }.into());
                    }

                    warn!("{}; retrying in {:?}", err, self.retry_delay);
                    report.query_retries += 1;

                    if !self.pause().await {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Sleep for the retry delay
    ///
    /// # Returns
    /// * `bool` - False if cancelled during the sleep
    async fn pause(&self) -> bool {
        match self.cancel_token {
            Some(ref token) => tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(self.retry_delay) => true,
            },
            None => {
                tokio::time::sleep(self.retry_delay).await;
                true
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Write one document to `<dir>/<id>.json`
    async fn write_document(&self, doc: &Document) -> std::result::Result<(), WriteError> {
        let file_name = doc.file_name();
        if doc.id.is_empty() || doc.id.contains(['/', '\\']) {
            return Err(WriteError::Persist {
                path: file_name,
                message: "id is not a valid file name".to_string(),
            });
        }

        let bytes = serde_json::to_vec(&doc.payload).map_err(|e| WriteError::Serialize {
            id: doc.id.clone(),
            message: e.to_string(),
        })?;

        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WriteError::Persist {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }
}

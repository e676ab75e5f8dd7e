//! Transfer pipeline between a directory and a document store
//!
//! Two directions are supported:
//!
//! - **push**: every `.json` file of a directory is parsed and committed to
//!   the store in bounded batches
//! - **pull**: the whole collection is paged through and written out as one
//!   `<id>.json` file per document
//!
//! # Architecture
//!
//! Push runs two tasks joined by a rendezvous channel:
//!
//! 1. **FileScanner**: reads and parses files, one document at a time
//! 2. **BulkSubmitter**: fills a **BatchAccumulator** and commits it
//!
//! The **PipelineCoordinator** owns the channel and the cancellation token
//! shared by both tasks, and reports the first failure of either side.
//!
//! Pull is a single sequential loop in the **PaginatedExporter**.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docsync::store::MemoryStore;
//! use docsync::transfer;
//!
//! # async fn example() -> docsync::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! transfer::push(store.clone(), "articles", "upload", 100).await?;
//! transfer::pull(store, "articles", "download", 100).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::store::DocumentStore;

pub mod batch;
pub mod coordinator;
pub mod exporter;
pub mod handoff;
pub mod progress;
pub mod scanner;
pub mod submitter;

pub use batch::BatchAccumulator;
pub use coordinator::{PipelineCoordinator, PushReport};
pub use exporter::{PaginatedExporter, PaginationCursor, PullReport};
pub use progress::ProgressTracker;
pub use scanner::FileScanner;
pub use submitter::BulkSubmitter;

/// Push every `.json` file of `source` into `index`
///
/// # Arguments
/// * `store` - Store receiving the documents
/// * `index` - Target index or collection
/// * `source` - Directory to scan
/// * `bulk_size` - Maximum documents per commit
pub async fn push(
    store: Arc<dyn DocumentStore>,
    index: &str,
    source: impl AsRef<Path>,
    bulk_size: usize,
) -> Result<PushReport> {
    PipelineCoordinator::new(store, index, source.as_ref(), bulk_size)
        .execute()
        .await
}

/// Pull every document of `index` into `dest`
///
/// Failed queries are retried forever with the default delay.
///
/// # Arguments
/// * `store` - Store to read from
/// * `index` - Source index or collection
/// * `dest` - Destination directory
/// * `page_size` - Documents per query
pub async fn pull(
    store: Arc<dyn DocumentStore>,
    index: &str,
    dest: impl AsRef<Path>,
    page_size: u64,
) -> Result<PullReport> {
    PaginatedExporter::new(store, index, dest.as_ref(), page_size)
        .execute()
        .await
}

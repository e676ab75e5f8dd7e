//! Remote document store abstraction
//!
//! The transfer pipeline only needs two capabilities from a store: commit a
//! batch of documents as one request, and read one page of a collection
//! together with the collection's current size. [`DocumentStore`] captures
//! exactly that, so a store handle can be passed explicitly into push and
//! pull and replaced by [`MemoryStore`] in tests.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::Result;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Outcome of a bulk write.
///
/// The pipeline treats the response as binary: either every document was
/// accepted or the batch failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Ids the store refused, empty on success
    pub rejected_ids: Vec<String>,
    /// Set when the store reported a failure it could not attribute to a document
    pub batch_error: Option<String>,
}

impl BulkResponse {
    /// Response for a fully accepted batch
    pub fn accepted() -> Self {
        Self::default()
    }

    /// Response rejecting the given ids
    pub fn rejected(ids: Vec<String>) -> Self {
        Self {
            rejected_ids: ids,
            batch_error: None,
        }
    }

    /// Whether every document in the batch was accepted
    pub fn is_accepted(&self) -> bool {
        self.rejected_ids.is_empty() && self.batch_error.is_none()
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    /// Documents in this page, at most `limit` of them
    pub documents: Vec<Document>,
    /// Size of the whole collection at the time of the query
    pub total: u64,
}

/// Trait for stores that documents are pushed to and pulled from
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a batch of documents as a single request, upserting by id
    ///
    /// # Arguments
    /// * `index` - Target index or collection name
    /// * `docs` - Documents to write
    ///
    /// # Returns
    /// * `Result<BulkResponse>` - Store verdict, or error if the request failed
    async fn bulk_write(&self, index: &str, docs: &[Document]) -> Result<BulkResponse>;

    /// Fetch one page of the whole collection
    ///
    /// # Arguments
    /// * `index` - Source index or collection name
    /// * `offset` - Number of documents to skip
    /// * `limit` - Maximum number of documents to return
    ///
    /// # Returns
    /// * `Result<QueryPage>` - Documents of the page and the current total
    async fn query(&self, index: &str, offset: u64, limit: u64) -> Result<QueryPage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_response_verdict() {
        assert!(BulkResponse::accepted().is_accepted());
        assert!(!BulkResponse::rejected(vec!["a".into()]).is_accepted());

        let failed = BulkResponse {
            rejected_ids: Vec::new(),
            batch_error: Some("write concern".into()),
        };
        assert!(!failed.is_accepted());
    }

    #[test]
    fn test_store_trait_object() {
        fn _accepts_store(_store: std::sync::Arc<dyn DocumentStore>) {}
    }
}

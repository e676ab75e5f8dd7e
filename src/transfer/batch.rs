//! Bounded batch of pending documents

use crate::document::Document;

/// Collects documents until a commit drains them
///
/// The batch never holds more than `capacity` documents: callers flush as
/// soon as [`is_full`](Self::is_full) reports true.
#[derive(Debug)]
pub struct BatchAccumulator {
    pending: Vec<Document>,
    capacity: usize,
}

impl BatchAccumulator {
    /// Create an empty batch
    ///
    /// # Arguments
    /// * `capacity` - Documents per commit, at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a document
    ///
    /// # Returns
    /// * `bool` - True if the batch is now full and must be flushed
    pub fn push(&mut self, doc: Document) -> bool {
        debug_assert!(!self.is_full(), "batch pushed past capacity");
        self.pending.push(doc);
        self.is_full()
    }

    /// Whether the batch reached its capacity
    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.capacity
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending documents
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Maximum number of documents per commit
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the pending documents if the batch is full
    pub fn flush_if_full(&mut self) -> Option<Vec<Document>> {
        if self.is_full() { Some(self.take()) } else { None }
    }

    /// Take whatever is left once the input is drained
    ///
    /// Returns `None` for an empty batch so no empty commit is ever sent.
    pub fn flush_remaining(&mut self) -> Option<Vec<Document>> {
        if self.is_empty() { None } else { Some(self.take()) }
    }

    fn take(&mut self) -> Vec<Document> {
        std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity))
    }
}

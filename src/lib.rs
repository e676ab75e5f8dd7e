//! docsync library
//!
//! Bulk transfer of JSON documents between a local directory and a
//! document store. Every `<id>.json` file of a directory can be pushed to a
//! collection in bounded batches, and a whole collection can be pulled back
//! into one file per document.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB connection management
//! - `document`: The unit of transfer
//! - `error`: Error types and handling
//! - `store`: Store abstraction with MongoDB and in-memory backends
//! - `transfer`: Push pipeline and pull exporter
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docsync::{config::Config, connection::ConnectionManager, store::MongoStore, transfer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(
//!         "mongodb://localhost:27017".to_string(),
//!         config.connection.clone(),
//!     );
//!     manager.connect().await?;
//!
//!     let store = Arc::new(MongoStore::new(manager.get_database("docsync")?));
//!     let report = transfer::push(store, "articles", "upload", 100).await?;
//!     println!("{}", report.throughput);
//!
//!     manager.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod document;
pub mod error;
pub mod store;
pub mod transfer;

// Re-export commonly used types
pub use config::Config;
pub use connection::ConnectionManager;
pub use document::Document;
pub use error::{Result, SyncError};
pub use store::{DocumentStore, MemoryStore, MongoStore};
pub use transfer::{PullReport, PushReport, pull, push};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

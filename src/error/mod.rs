//! Error handling for docsync.
//!
//! The transfer pipeline distinguishes fatal errors, which abort a push or
//! pull and end the process with a non-zero status, from the two kinds the
//! pull loop recovers from locally:
//!
//! - [`ScanError`], [`ParseError`], [`CommitError`]: fatal, push aborts
//! - [`QueryError`]: logged and retried by the exporter
//! - [`WriteError`]: logged, the offending document is skipped
//!
//! # Example
//!
//! ```rust
//! use docsync::error::{CommitError, Result, SyncError};
//!
//! fn commit(accepted: bool) -> Result<()> {
//!     if !accepted {
//!         return Err(CommitError::Transport("connection reset".into()).into());
//!     }
//!     Ok(())
//! }
//!
//! let err = commit(false).unwrap_err();
//! assert!(matches!(err, SyncError::Commit(_)));
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    CommitError, ConfigError, ConnectionError, ParseError, QueryError, Result, ScanError,
    SyncError, WriteError,
};

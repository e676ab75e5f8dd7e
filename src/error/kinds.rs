use std::{fmt, io};

/// Crate-wide `Result` type using [`SyncError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Top-level error type for docsync operations.
///
/// Wraps the transfer-specific error kinds so push, pull and the binary
/// can share a single error type.
#[derive(Debug)]
pub enum SyncError {
    /// Source directory or file could not be read.
    Scan(ScanError),

    /// A source file is not valid JSON.
    Parse(ParseError),

    /// A bulk write was rejected or could not be delivered.
    Commit(CommitError),

    /// A page query against the store failed.
    Query(QueryError),

    /// An exported document could not be written.
    Write(WriteError),

    /// Configuration errors.
    Config(ConfigError),

    /// Connection-related errors.
    Connection(ConnectionError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),

    /// JSON conversion errors outside of file parsing.
    Json(String),

    /// The run was cancelled before it could finish.
    Cancelled,

    /// Generic error with a free-form message.
    Generic(String),
}

/// Errors raised while enumerating or reading the source directory.
#[derive(Debug)]
pub enum ScanError {
    /// The directory itself could not be listed.
    ListDirectory { path: String, message: String },

    /// An eligible file could not be read.
    ReadFile { path: String, message: String },
}

/// Errors raised while decoding a source file.
#[derive(Debug)]
pub enum ParseError {
    /// File contents are not a valid JSON value.
    InvalidJson { path: String, message: String },
}

/// Errors raised while committing a batch.
#[derive(Debug)]
pub enum CommitError {
    /// The store answered but refused part or all of the batch.
    Rejected {
        batch_size: usize,
        rejected_ids: Vec<String>,
        reason: Option<String>,
    },

    /// The request never produced a usable answer.
    Transport(String),

    /// The batch could not be encoded for the store.
    Encode { id: String, message: String },
}

/// Errors raised while fetching a page during pull.
#[derive(Debug)]
pub enum QueryError {
    /// A single query attempt failed.
    Failed { offset: u64, message: String },

    /// The configured retry bound was reached at one offset.
    RetriesExhausted { offset: u64, attempts: u32 },
}

/// Errors raised while persisting one exported document.
#[derive(Debug)]
pub enum WriteError {
    /// Payload could not be serialized.
    Serialize { id: String, message: String },

    /// Serialized payload could not be written to disk.
    Persist { path: String, message: String },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Generic configuration error.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

impl SyncError {
    /// Whether this error ends a run.
    ///
    /// Query and write failures are recovered inside the pull loop; every
    /// other kind aborts the transfer.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::Query(QueryError::Failed { .. }) | SyncError::Write(_))
    }

    /// Whether this error is the cancellation marker rather than a cause.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Scan(e) => write!(f, "Scan error: {e}"),
            SyncError::Parse(e) => write!(f, "Parse error: {e}"),
            SyncError::Commit(e) => write!(f, "Commit error: {e}"),
            SyncError::Query(e) => write!(f, "Query error: {e}"),
            SyncError::Write(e) => write!(f, "Write error: {e}"),
            SyncError::Config(e) => write!(f, "Configuration error: {e}"),
            SyncError::Connection(e) => write!(f, "Connection error: {e}"),
            SyncError::Io(e) => write!(f, "I/O error: {e}"),
            SyncError::MongoDb(e) => write!(f, "MongoDB error: {e}"),
            SyncError::Json(msg) => write!(f, "JSON error: {msg}"),
            SyncError::Cancelled => write!(f, "Operation cancelled"),
            SyncError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::ListDirectory { path, message } => {
                write!(f, "cannot list directory '{path}': {message}")
            }
            ScanError::ReadFile { path, message } => {
                write!(f, "cannot read '{path}': {message}")
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidJson { path, message } => {
                write!(f, "'{path}' is not valid JSON: {message}")
            }
        }
    }
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::Rejected {
                batch_size,
                rejected_ids,
                reason,
            } => {
                if rejected_ids.is_empty() {
                    write!(f, "bulk commit of {batch_size} documents failed")?;
                } else {
                    write!(
                        f,
                        "bulk commit failed: {} of {batch_size} documents rejected ({})",
                        rejected_ids.len(),
                        rejected_ids.join(", ")
                    )?;
                }
                match reason {
                    Some(reason) => write!(f, ": {reason}"),
                    None => Ok(()),
                }
            }
            CommitError::Transport(msg) => write!(f, "bulk request failed: {msg}"),
            CommitError::Encode { id, message } => {
                write!(f, "document '{id}' cannot be stored: {message}")
            }
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Failed { offset, message } => {
                write!(f, "query at offset {offset} failed: {message}")
            }
            QueryError::RetriesExhausted { offset, attempts } => {
                write!(f, "query at offset {offset} failed {attempts} times, giving up")
            }
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Serialize { id, message } => {
                write!(f, "cannot serialize document '{id}': {message}")
            }
            WriteError::Persist { path, message } => {
                write!(f, "cannot write '{path}': {message}")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}
impl std::error::Error for ScanError {}
impl std::error::Error for ParseError {}
impl std::error::Error for CommitError {}
impl std::error::Error for QueryError {}
impl std::error::Error for WriteError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for ConnectionError {}

/* ========================= Conversions to SyncError ========================= */

impl From<io::Error> for SyncError {
    fn from(err: io::Error) -> Self {
        SyncError::Io(err)
    }
}

impl From<mongodb::error::Error> for SyncError {
    fn from(err: mongodb::error::Error) -> Self {
        SyncError::MongoDb(err)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err.to_string())
    }
}

impl From<ScanError> for SyncError {
    fn from(err: ScanError) -> Self {
        SyncError::Scan(err)
    }
}

impl From<ParseError> for SyncError {
    fn from(err: ParseError) -> Self {
        SyncError::Parse(err)
    }
}

impl From<CommitError> for SyncError {
    fn from(err: CommitError) -> Self {
        SyncError::Commit(err)
    }
}

impl From<QueryError> for SyncError {
    fn from(err: QueryError) -> Self {
        SyncError::Query(err)
    }
}

impl From<WriteError> for SyncError {
    fn from(err: WriteError) -> Self {
        SyncError::Write(err)
    }
}

impl From<ConfigError> for SyncError {
    fn from(err: ConfigError) -> Self {
        SyncError::Config(err)
    }
}

impl From<ConnectionError> for SyncError {
    fn from(err: ConnectionError) -> Self {
        SyncError::Connection(err)
    }
}

impl From<String> for SyncError {
    fn from(msg: String) -> Self {
        SyncError::Generic(msg)
    }
}

impl From<&str> for SyncError {
    fn from(msg: &str) -> Self {
        SyncError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds_are_not_fatal() {
        let query = SyncError::from(QueryError::Failed {
            offset: 100,
            message: "timeout".to_string(),
        });
        let write = SyncError::from(WriteError::Persist {
            path: "out/a.json".to_string(),
            message: "denied".to_string(),
        });
        assert!(!query.is_fatal());
        assert!(!write.is_fatal());
    }

    #[test]
    fn test_exhausted_retries_are_fatal() {
        let err = SyncError::from(QueryError::RetriesExhausted {
            offset: 0,
            attempts: 3,
        });
        assert!(err.is_fatal());
    }

    #[test]
    fn test_commit_rejection_message_lists_ids() {
        let err = SyncError::from(CommitError::Rejected {
            batch_size: 3,
            rejected_ids: vec!["a".to_string(), "c".to_string()],
            reason: None,
        });
        assert_eq!(
            err.to_string(),
            "Commit error: bulk commit failed: 2 of 3 documents rejected (a, c)"
        );
    }

    #[test]
    fn test_commit_failure_reason_is_appended() {
        let err = CommitError::Rejected {
            batch_size: 2,
            rejected_ids: Vec::new(),
            reason: Some("write concern timeout".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "bulk commit of 2 documents failed: write concern timeout"
        );
    }

    #[test]
    fn test_cancelled_marker() {
        assert!(SyncError::Cancelled.is_cancelled());
        assert!(SyncError::Cancelled.is_fatal());
        assert!(!SyncError::Generic("x".into()).is_cancelled());
    }
}

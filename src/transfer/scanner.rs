//! Source directory scanner
//!
//! Lists the eligible `.json` entries of a directory in file-name order,
//! then reads and parses them one at a time, handing each document to the
//! submitter. The first unreadable or malformed file ends the scan.

use std::path::PathBuf;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::document::{Document, id_from_file_name};
use crate::error::{ParseError, Result, ScanError, SyncError};

use super::handoff::HandoffSender;

/// One eligible directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Document id derived from the file name
    pub id: String,
    /// Full path of the file
    pub path: PathBuf,
}

/// Producer side of the push pipeline
#[derive(Debug, Clone)]
pub struct FileScanner {
    dir: PathBuf,
}

impl FileScanner {
    /// Create a scanner for `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List eligible files, sorted by file name
    ///
    /// Subdirectories and names without the `.json` suffix are skipped.
    ///
    /// # Returns
    /// * `Result<Vec<SourceFile>>` - Eligible files, or ScanError if the
    ///   directory cannot be listed
    pub async fn list(&self) -> Result<Vec<SourceFile>> {
        let list_err = |e: std::io::Error| ScanError::ListDirectory {
            path: self.dir.display().to_string(),
            message: e.to_string(),
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(list_err)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                debug!("Skipping non UTF-8 entry {:?}", entry.path());
                continue;
            };
            let Some(id) = id_from_file_name(name) else {
                continue;
            };
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                debug!("Skipping directory {}", name);
                continue;
            }
            files.push(SourceFile {
                id: id.to_string(),
                path: entry.path(),
            });
        }

        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(files)
    }

    /// Read and parse one source file
    pub async fn read_document(file: &SourceFile) -> Result<Document> {
        let path = file.path.display().to_string();
        let bytes = tokio::fs::read(&file.path)
            .await
            .map_err(|e| ScanError::ReadFile {
                path: path.clone(),
                message: e.to_string(),
            })?;
        let payload: Value = serde_json::from_slice(&bytes).map_err(|e| ParseError::InvalidJson {
            path,
            message: e.to_string(),
        })?;
        Ok(Document::new(file.id.clone(), payload))
    }

    /// Scan the directory and hand every document to `tx`
    ///
    /// Stops at the first read or parse failure, and as soon as `cancel`
    /// fires while waiting for the consumer.
    ///
    /// # Returns
    /// * `Result<u64>` - Number of documents handed over
    pub async fn run(
        &self,
        tx: &HandoffSender<Document>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let files = self.list().await?;
        info!("Scanning {} files in {}", files.len(), self.dir.display());

        let mut sent = 0u64;
        for file in &files {
            let doc = Self::read_document(file).await?;
            if tx.send(doc, cancel).await.is_err() {
                debug!("Scanner stopped after {} documents", sent);
                return Err(SyncError::Cancelled);
            }
            sent += 1;
        }

        debug!("Scanner finished: {} documents", sent);
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::handoff::handoff;
    use crate::error::ScanError;
    use crate::store::MemoryStore;
    use crate::transfer::coordinator::PipelineCoordinator;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.json", "{}");
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "notes.txt", "hello");
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = FileScanner::new(dir.path()).list().await.unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileScanner::new(dir.path().join("absent")).list().await;
        assert!(matches!(result, Err(SyncError::Scan(ScanError::ListDirectory { .. }))));
    }

    #[tokio::test]
    async fn test_read_document_accepts_any_json_value() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "n.json", "[1, \"two\", null]");

        let file = SourceFile {
            id: "n".to_string(),
            path: dir.path().join("n.json"),
        };
        let doc = FileScanner::read_document(&file).await.unwrap();
        assert_eq!(doc, Document::new("n", json!([1, "two", null])));
    }

    #[tokio::test]
    async fn test_read_document_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.json", "{\"x\":");

        let file = SourceFile {
            id: "bad".to_string(),
            path: dir.path().join("bad.json"),
        };
        let result = FileScanner::read_document(&file).await;
        assert!(matches!(result, Err(SyncError::Parse(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "b.json", "{}");

        let (tx, _rx) = handoff();
        let token = CancellationToken::new();
        token.cancel();

        let result = FileScanner::new(dir.path()).run(&tx, &token).await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
    }

    #[tokio::test]
    async fn test_run_hands_over_documents_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.json", "{\"y\":2}");
        write(dir.path(), "a.json", "{\"x\":1}");

        let (tx, mut rx) = handoff::<Document>();
        let token = CancellationToken::new();
        let scanner = FileScanner::new(dir.path());

        let consumer_token = token.clone();
        let consumer = tokio::spawn(async move {
            let mut ids = Vec::new();
            while let Some(doc) = rx.recv(&consumer_token).await.unwrap() {
                ids.push(doc.id);
            }
            ids
        });

        let sent = scanner.run(&tx, &token).await.unwrap();
        drop(tx);
        assert_eq!(sent, 2);
        assert_eq!(consumer.await.unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_file_aborts_push() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{}");
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("b.json")).unwrap();
        let store = Arc::new(MemoryStore::new());

        let err = PipelineCoordinator::new(store.clone(), "idx", dir.path(), 10)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Scan(ScanError::ReadFile { .. })));
        assert_eq!(store.commit_attempts(), 0);
    }
}

//! Document model shared by push and pull
//!
//! A [`Document`] is the unit of transfer: an identifier plus an arbitrary
//! JSON payload. On disk a document lives in `<id>.json`; the id of a source
//! file is its name with the `.json` suffix removed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// File name suffix that marks a directory entry as a document.
pub const JSON_SUFFIX: &str = ".json";

/// One identifier plus JSON payload.
///
/// Ids are not checked for uniqueness. A store that upserts by id keeps
/// the last document pushed under a given id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier
    pub id: String,
    /// Any valid JSON value
    pub payload: Value,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Name of the file this document is exported to
    pub fn file_name(&self) -> String {
        format!("{}{}", self.id, JSON_SUFFIX)
    }
}

/// Derive a document id from a directory entry name.
///
/// Any name containing `.json` is eligible; the id is everything before the
/// last occurrence of the suffix. Returns `None` for ineligible names and for
/// names that would yield an empty id (such as `.json`).
///
/// # Examples
/// ```
/// use docsync::document::id_from_file_name;
///
/// assert_eq!(id_from_file_name("user-42.json"), Some("user-42"));
/// assert_eq!(id_from_file_name("season.json"), Some("season"));
/// assert_eq!(id_from_file_name("notes.txt"), None);
/// ```
pub fn id_from_file_name(name: &str) -> Option<&str> {
    let idx = name.rfind(JSON_SUFFIX)?;
    let id = &name[..idx];
    if id.is_empty() { None } else { Some(id) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_strips_suffix() {
        assert_eq!(id_from_file_name("a.json"), Some("a"));
        assert_eq!(id_from_file_name("archive.2024.json"), Some("archive.2024"));
    }

    #[test]
    fn test_id_keeps_trailing_letters_of_the_stem() {
        // "son" must survive: only the suffix is removed, not a character set
        assert_eq!(id_from_file_name("json.json"), Some("json"));
        assert_eq!(id_from_file_name("person.json"), Some("person"));
    }

    #[test]
    fn test_names_without_suffix_are_ineligible() {
        assert_eq!(id_from_file_name("notes.txt"), None);
        assert_eq!(id_from_file_name("README"), None);
        assert_eq!(id_from_file_name(".json"), None);
    }

    #[test]
    fn test_contained_suffix_is_eligible() {
        assert_eq!(id_from_file_name("dump.json.bak"), Some("dump"));
        assert_eq!(id_from_file_name("events.jsonl"), Some("events"));
    }

    #[test]
    fn test_file_name_round_trips_id() {
        let doc = Document::new("order-7", json!({"total": 12}));
        let name = doc.file_name();
        assert_eq!(name, "order-7.json");
        assert_eq!(id_from_file_name(&name), Some("order-7"));
    }
}

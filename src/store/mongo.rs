//! MongoDB-backed document store
//!
//! An index maps to a collection of the configured database. A batch is
//! committed as one `update` command holding an upsert statement per
//! document, keyed by `_id`, so pushing the same directory twice leaves one
//! document per id. Pages are read with `find` sorted by `_id` and the total
//! comes from `count_documents`.

use async_trait::async_trait;
use bson::{self, Bson, doc};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::{CommitError, Result};

use super::{BulkResponse, DocumentStore, QueryPage};

/// Store writing to and reading from collections of one MongoDB database
#[derive(Debug, Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Create a store on top of a database handle
    ///
    /// # Arguments
    /// * `database` - Database whose collections act as indexes
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn bulk_write(&self, index: &str, docs: &[Document]) -> Result<BulkResponse> {
        if docs.is_empty() {
            return Ok(BulkResponse::accepted());
        }

        let command = build_update_command(index, docs)?;
        debug!("Sending bulk upsert of {} documents to '{}'", docs.len(), index);

        let reply = self.database.run_command(command).await?;
        Ok(parse_update_reply(&reply, docs))
    }

    async fn query(&self, index: &str, offset: u64, limit: u64) -> Result<QueryPage> {
        let coll: Collection<bson::Document> = self.database.collection(index);

        let total = coll.count_documents(doc! {}).await?;
        let cursor = coll
            .find(doc! {})
            .sort(doc! { "_id": 1 })
            .skip(offset)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?;
        let raw: Vec<bson::Document> = cursor.try_collect().await?;

        debug!(
            "Fetched {} documents from '{}' at offset {} (total: {})",
            raw.len(),
            index,
            offset,
            total
        );

        Ok(QueryPage {
            documents: raw.into_iter().map(document_from_bson).collect(),
            total,
        })
    }
}

/// Convert a document into the BSON body stored under its id
///
/// Only JSON objects can be stored. An `_id` field in the payload is
/// replaced by the document id.
pub(crate) fn to_bson_body(doc: &Document) -> std::result::Result<bson::Document, String> {
    if !doc.payload.is_object() {
        return Err("payload must be a JSON object".to_string());
    }
    let mut body = bson::to_document(&doc.payload).map_err(|e| e.to_string())?;
    body.insert("_id", doc.id.clone());
    Ok(body)
}

/// Build the `update` command upserting every document of a batch
fn build_update_command(collection: &str, docs: &[Document]) -> Result<bson::Document> {
    let mut updates = Vec::with_capacity(docs.len());
    for d in docs {
        let body = to_bson_body(d).map_err(|message| CommitError::Encode {
            id: d.id.clone(),
            message,
        })?;
        updates.push(Bson::Document(doc! {
            "q": { "_id": d.id.as_str() },
            "u": body,
            "upsert": true,
        }));
    }

    Ok(doc! {
        "update": collection,
        "updates": updates,
        "ordered": true,
    })
}

/// Interpret the reply of an `update` command
fn parse_update_reply(reply: &bson::Document, docs: &[Document]) -> BulkResponse {
    let mut response = BulkResponse::accepted();

    if !reply_ok(reply) {
        let msg = reply.get_str("errmsg").unwrap_or("command not acknowledged");
        response.batch_error = Some(msg.to_string());
    }

    if let Ok(errors) = reply.get_array("writeErrors") {
        for err in errors {
            let index = err
                .as_document()
                .and_then(|e| e.get("index"))
                .and_then(bson_as_i64);
            let id = index
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| docs.get(i))
                .map(|d| d.id.clone())
                .unwrap_or_else(|| "<unknown>".to_string());
            response.rejected_ids.push(id);
        }
    }

    if let Ok(wc) = reply.get_document("writeConcernError") {
        let msg = wc.get_str("errmsg").unwrap_or("write concern error");
        response.batch_error = Some(msg.to_string());
    }

    response
}

fn reply_ok(reply: &bson::Document) -> bool {
    match reply.get("ok") {
        Some(Bson::Double(v)) => *v == 1.0,
        Some(other) => bson_as_i64(other) == Some(1),
        None => false,
    }
}

fn bson_as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}

/// Convert a stored BSON document back into a transfer document
///
/// The id is the `_id` rendered as text; the payload is the rest of the
/// document as relaxed extended JSON.
pub(crate) fn document_from_bson(mut raw: bson::Document) -> Document {
    let id = match raw.remove("_id") {
        Some(Bson::String(s)) => s,
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => match other.into_relaxed_extjson() {
            Value::String(s) => s,
            value => value.to_string(),
        },
        None => String::new(),
    };
    let payload = Bson::Document(raw).into_relaxed_extjson();
    Document::new(id, payload)
}

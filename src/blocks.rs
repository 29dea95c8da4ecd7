//! 3D block catalog over the document store
//!
//! Blocks are free-form JSON objects keyed by an integer `id`. Writes keep
//! every field the caller sends; reads only expose [`ALLOWED_FIELDS`].

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore};

pub const COLLECTION: &str = "objects3d";

/// Fields returned to readers
pub const ALLOWED_FIELDS: [&str; 7] = [
    "tenKhoi",
    "loaiKhoi",
    "blobUrl",
    "canNang",
    "id",
    "donViCanNang",
    "kichThuoc",
];

const INVALID_ID: &str = "ID field must be an integer or convertible to an integer";

/// Integer id from a JSON number or numeric string
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keep only the allowed fields, normalizing `id` to an integer when possible
pub fn project(doc: &Document) -> Document {
    let mut projected: Document = ALLOWED_FIELDS
        .iter()
        .filter_map(|field| doc.get(*field).map(|v| (field.to_string(), v.clone())))
        .collect();

    if let Some(id) = projected.get("id").and_then(coerce_id) {
        projected.insert("id".to_string(), Value::from(id));
    }
    projected
}

/// Outcome of deleting several blocks at once
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_ids: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_found_ids: Vec<i64>,
}

impl BulkDeleteReport {
    pub fn message(&self) -> String {
        format!("Deleted {} blocks successfully", self.deleted)
    }

    pub fn nothing_deleted(&self) -> bool {
        self.deleted == 0
    }

    pub fn had_invalid_ids(&self) -> bool {
        !self.failed_ids.is_empty()
    }
}

/// What a delete request asked for
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteRequest {
    Single(i64),
    Many(Vec<Value>),
}

impl DeleteRequest {
    /// Read `{"id": ..}` or `{"ids": [..]}`
    pub fn from_body(body: &Value) -> Result<Self> {
        let body = body
            .as_object()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::validation("No data provided"))?;

        match (body.get("id"), body.get("ids")) {
            (Some(_), Some(_)) => Err(Error::validation(
                "Request is ambiguous. Please provide either \"id\" or \"ids\", not both",
            )),
            (Some(id), None) => coerce_id(id)
                .map(DeleteRequest::Single)
                .ok_or_else(|| Error::validation(INVALID_ID)),
            (None, Some(Value::Array(ids))) if ids.is_empty() => {
                Err(Error::validation("The \"ids\" array is empty"))
            }
            (None, Some(Value::Array(ids))) => Ok(DeleteRequest::Many(ids.clone())),
            (None, Some(_)) => Err(Error::validation("The \"ids\" field must be an array")),
            (None, None) => Err(Error::validation(
                "Either \"id\" or \"ids\" field is required",
            )),
        }
    }
}

/// Split a write body into its integer id and the document to store
fn keyed_document(body: Value) -> Result<(i64, Document)> {
    let mut doc = match body {
        Value::Object(doc) if !doc.is_empty() => doc,
        _ => return Err(Error::validation("No data provided")),
    };
    let id = doc
        .get("id")
        .ok_or_else(|| Error::validation("ID field is required"))
        .and_then(|v| coerce_id(v).ok_or_else(|| Error::validation(INVALID_ID)))?;
    doc.insert("id".to_string(), Value::from(id));
    Ok((id, doc))
}

#[derive(Clone)]
pub struct BlockCatalog {
    documents: Arc<dyn DocumentStore>,
}

impl BlockCatalog {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn list(&self) -> Result<Vec<Document>> {
        let docs = self.documents.list(COLLECTION).await?;
        Ok(docs.iter().map(project).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        let key = id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::NotFound("Block".to_string()))?;
        self.documents
            .get(COLLECTION, &key.to_string())
            .await?
            .map(|doc| project(&doc))
            .ok_or_else(|| Error::NotFound("Block".to_string()))
    }

    /// Store a block under its `id`, replacing any previous version
    pub async fn create(&self, body: Value) -> Result<Document> {
        let (id, doc) = keyed_document(body)?;
        self.documents.put(COLLECTION, &id.to_string(), doc.clone()).await?;
        tracing::info!("Stored block {}", id);
        Ok(doc)
    }

    /// Merge the sent fields into an existing block
    pub async fn update(&self, body: Value) -> Result<Document> {
        let (id, fields) = keyed_document(body)?;
        let key = id.to_string();

        if !self.documents.update(COLLECTION, &key, fields).await? {
            return Err(Error::NotFound("Block".to_string()));
        }
        self.documents
            .get(COLLECTION, &key)
            .await?
            .ok_or_else(|| Error::NotFound("Block".to_string()))
    }

    pub async fn delete_one(&self, id: i64) -> Result<()> {
        if !self.documents.delete(COLLECTION, &id.to_string()).await? {
            return Err(Error::NotFound("Block".to_string()));
        }
        tracing::info!("Deleted block {}", id);
        Ok(())
    }

    /// Delete each id independently and report what happened to each
    pub async fn delete_many(&self, ids: &[Value]) -> Result<BulkDeleteReport> {
        let mut report = BulkDeleteReport::default();
        for raw in ids {
            let Some(id) = coerce_id(raw) else {
                report.failed_ids.push(raw.clone());
                continue;
            };
            if self.documents.delete(COLLECTION, &id.to_string()).await? {
                report.deleted += 1;
            } else {
                report.not_found_ids.push(id);
            }
        }
        tracing::info!(
            "Bulk block delete: {} deleted, {} not found, {} invalid",
            report.deleted,
            report.not_found_ids.len(),
            report.failed_ids.len()
        );
        Ok(report)
    }
}

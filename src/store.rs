//! Persistence for enriched documents.
//!
//! Records are written once, after enrichment finishes, and never updated. The in-memory
//! implementation backs the service and tests; a durable backend slots in behind
//! [`DocumentStore`].

use crate::enrichment::EnrichmentResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not complete the operation.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Document ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    /// Original file name as uploaded.
    pub file_name: String,
    /// Extracted text, used only for the content hash.
    pub text: String,
    /// Enrichment outcome stored alongside the document.
    pub enrichment: EnrichmentResult,
}

/// Persisted document with its enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Random identifier assigned on insert.
    pub id: String,
    /// Original file name as uploaded.
    pub file_name: String,
    /// SHA-256 of the extracted text, hex encoded.
    pub content_hash: String,
    /// Insertion time, RFC 3339.
    pub created_at: String,
    /// Monotonic insertion counter; newer records carry larger values.
    pub sequence: u64,
    /// Summary and questions, including any error markers.
    pub enrichment: EnrichmentResult,
}

/// Storage backend for enriched documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist `document` and return the stored record.
    async fn insert(&self, document: NewDocument) -> Result<DocumentRecord, StoreError>;

    /// Every stored record, newest first.
    async fn list_all(&self) -> Result<Vec<DocumentRecord>, StoreError>;
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    records: RwLock<Vec<DocumentRecord>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: NewDocument) -> Result<DocumentRecord, StoreError> {
        // Sequence and timestamp are assigned under the write lock so both follow insert order.
        let mut records = self.records.write().await;
        let record = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            content_hash: compute_content_hash(&document.text),
            file_name: document.file_name,
            created_at: current_timestamp_rfc3339(),
            sequence: records.len() as u64 + 1,
            enrichment: document.enrichment,
        };
        tracing::debug!(id = %record.id, file_name = %record.file_name, "Stored document");
        records.push(record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let mut records = self.records.read().await.clone();
        records.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(records)
    }
}

/// Deterministic SHA-256 hash of document text.
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

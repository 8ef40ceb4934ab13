//! JSON-document persistence for event polls and verification progress.
//!
//! Each collection lives in its own file shaped `{"<collection>": [record, ...]}`.
//! Records are loose JSON objects at this layer; the typed repositories in
//! [`repositories`] map them onto the domain records.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use guildhall_core::errors::{ApplicationError, DomainError};

pub mod document;
pub mod file;
pub mod memory;
pub mod repositories;

pub use document::{CollectionSpec, Retention};
pub use file::JsonFileStore;
pub use memory::InMemoryRecordStore;
pub use repositories::{EventRepository, VerificationRepository};

pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document `{path}` is malformed: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("failed to serialize document: {0}")]
    Serialize(String),
    #[error("record is missing its `{field}` identifier")]
    MissingId { field: &'static str },
    #[error("record `{id}` was not found")]
    NotFound { id: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for ApplicationError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { id } => {
                ApplicationError::Domain(DomainError::NotFound { entity: "record", id })
            }
            other => ApplicationError::Storage(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PutOutcome {
    /// Records dropped by the retention rule during this write.
    pub pruned: usize,
}

/// Keyed collection of JSON records persisted as one document.
///
/// Ids are compared as strings; a numeric id field matches its decimal form.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn collection(&self) -> &CollectionSpec;

    /// Appends a record, stamping creation fields when absent, then applies retention.
    async fn put(&self, record: Record) -> Result<PutOutcome, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Shallow-merges `fields` into the record and stamps the update time.
    async fn update_fields(&self, id: &str, fields: Record) -> Result<Record, StoreError>;

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, StoreError>;

    async fn list_all(&self) -> Result<Vec<Record>, StoreError>;

    /// The last `limit` records in reverse insertion order.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StoreError>;

    /// Replaces the record with the same id in place, or appends it.
    async fn upsert(&self, record: Record) -> Result<Record, StoreError>;

    /// Keeps only the `keep` most recently inserted records.
    async fn retain_recent(&self, keep: usize) -> Result<usize, StoreError>;
}

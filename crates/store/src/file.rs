use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use guildhall_core::clock;

use crate::document::{self, CollectionSpec};
use crate::{PutOutcome, Record, RecordStore, StoreError};

/// A collection persisted as a pretty-printed JSON file.
///
/// Every mutation runs load, modify and write under one lock, and the write
/// lands through a sibling temp file renamed over the original. A document
/// that fails to parse aborts the mutation without touching the file.
pub struct JsonFileStore {
    path: PathBuf,
    spec: CollectionSpec,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the collection, creating an empty document (and parent
    /// directories) when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>, spec: CollectionSpec) -> Result<Self, StoreError> {
        let store = Self { path: path.into(), spec, write_lock: Mutex::new(()) };
        store.ensure_exists().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_exists(&self) -> Result<(), StoreError> {
        if tokio::fs::try_exists(&self.path).await.map_err(|source| self.io(source))? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|source| self.io(source))?;
        }
        self.persist(&[]).await?;
        info!(
            event_name = "store.document_created",
            collection = self.spec.name,
            path = %self.path.display(),
            "created empty document"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Vec<Record>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => document::parse(&self.spec, &raw, &self.path),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(self.io(source)),
        }
    }

    async fn persist(&self, records: &[Record]) -> Result<(), StoreError> {
        let rendered = document::render(&self.spec, records)?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, rendered).await.map_err(|source| self.io(source))?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|source| self.io(source))?;
        debug!(
            event_name = "store.document_written",
            collection = self.spec.name,
            records = records.len(),
            "document written"
        );
        Ok(())
    }

    async fn mutate<T>(
        &self,
        operation: impl FnOnce(&mut Vec<Record>) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let outcome = operation(&mut records)?;
        self.persist(&records).await?;
        Ok(outcome)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.clone(), source }
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    fn collection(&self) -> &CollectionSpec {
        &self.spec
    }

    async fn put(&self, record: Record) -> Result<PutOutcome, StoreError> {
        let spec = self.spec.clone();
        let pruned = self
            .mutate(move |records| document::put(&spec, records, record, clock::now_brasilia()))
            .await?;
        if pruned > 0 {
            info!(
                event_name = "store.retention_applied",
                collection = self.spec.name,
                pruned,
                "pruned oldest records"
            );
        }
        Ok(PutOutcome { pruned })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Record>, StoreError> {
        let records = self.load().await?;
        Ok(document::get(&self.spec, &records, id))
    }

    async fn update_fields(&self, id: &str, fields: Record) -> Result<Record, StoreError> {
        let spec = self.spec.clone();
        self.mutate(move |records| {
            document::update_fields(&spec, records, id, fields, clock::now_brasilia())
        })
        .await
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, StoreError> {
        let spec = self.spec.clone();
        let removed = self.mutate(move |records| Ok(document::delete(&spec, records, ids))).await?;
        info!(
            event_name = "store.records_deleted",
            collection = self.spec.name,
            removed,
            "deleted records"
        );
        Ok(removed)
    }

    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        self.load().await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        let records = self.load().await?;
        Ok(document::recent(&records, limit))
    }

    async fn upsert(&self, record: Record) -> Result<Record, StoreError> {
        let spec = self.spec.clone();
        self.mutate(move |records| document::upsert(&spec, records, record, clock::now_brasilia()))
            .await
    }

    async fn retain_recent(&self, keep: usize) -> Result<usize, StoreError> {
        let removed = self.mutate(move |records| Ok(document::retain_recent(records, keep))).await?;
        info!(
            event_name = "store.cleanup_applied",
            collection = self.spec.name,
            removed,
            keep,
            "kept most recent records"
        );
        Ok(removed)
    }
}

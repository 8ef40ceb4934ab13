use tokio::sync::RwLock;

use guildhall_core::clock;

use crate::document::{self, CollectionSpec};
use crate::{PutOutcome, Record, RecordStore, StoreError};

/// Volatile store with the same semantics as [`crate::JsonFileStore`].
pub struct InMemoryRecordStore {
    spec: CollectionSpec,
    records: RwLock<Vec<Record>>,
}

impl InMemoryRecordStore {
    pub fn new(spec: CollectionSpec) -> Self {
        Self { spec, records: RwLock::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    fn collection(&self) -> &CollectionSpec {
        &self.spec
    }

    async fn put(&self, record: Record) -> Result<PutOutcome, StoreError> {
        let mut records = self.records.write().await;
        let pruned = document::put(&self.spec, &mut records, record, clock::now_brasilia())?;
        Ok(PutOutcome { pruned })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(document::get(&self.spec, &records, id))
    }

    async fn update_fields(&self, id: &str, fields: Record) -> Result<Record, StoreError> {
        let mut records = self.records.write().await;
        document::update_fields(&self.spec, &mut records, id, fields, clock::now_brasilia())
    }

    async fn delete_by_ids(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        Ok(document::delete(&self.spec, &mut records, ids))
    }

    async fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Record>, StoreError> {
        let records = self.records.read().await;
        Ok(document::recent(&records, limit))
    }

    async fn upsert(&self, record: Record) -> Result<Record, StoreError> {
        let mut records = self.records.write().await;
        document::upsert(&self.spec, &mut records, record, clock::now_brasilia())
    }

    async fn retain_recent(&self, keep: usize) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        Ok(document::retain_recent(&mut records, keep))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::InMemoryRecordStore;
    use crate::document::{CollectionSpec, Retention};
    use crate::{RecordStore, StoreError};

    #[tokio::test]
    async fn in_memory_store_applies_retention_and_updates() {
        let store = InMemoryRecordStore::new(CollectionSpec::events(Retention { ceiling: 4, keep: 2 }));
        for index in 0..4 {
            let record = json!({"event_id": index.to_string()});
            let outcome = store
                .put(record.as_object().cloned().expect("object"))
                .await
                .expect("put");
            assert_eq!(outcome.pruned, if index == 3 { 2 } else { 0 });
        }

        let patch = json!({"ativa": false}).as_object().cloned().expect("object");
        let updated = store.update_fields("3", patch).await.expect("update");
        assert_eq!(updated["ativa"], false);

        assert!(store.get_by_id("0").await.expect("get").is_none());
        assert!(matches!(
            store.update_fields("0", serde_json::Map::new()).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}

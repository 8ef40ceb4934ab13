use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use guildhall_core::domain::category::Category;
use guildhall_core::domain::event::{EventRecord, ParticipantEntry};
use guildhall_core::domain::ids::{EventId, MessageId};

use super::{decode, decode_all, encode};
use crate::{PutOutcome, Record, RecordStore, StoreError};

/// Events shown by the result and deletion pickers.
pub const RECENT_EVENTS_LIMIT: usize = 5;

#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn RecordStore>,
}

impl EventRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, event: &EventRecord) -> Result<PutOutcome, StoreError> {
        self.store.put(encode(event)?).await
    }

    pub async fn find(&self, id: &EventId) -> Result<Option<EventRecord>, StoreError> {
        self.store.get_by_id(id.as_str()).await?.map(decode).transpose()
    }

    pub async fn find_by_message(&self, message_id: MessageId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.all().await?.into_iter().find(|event| event.message_id == Some(message_id)))
    }

    /// Overwrites the persisted roster with the given snapshot.
    pub async fn update_participants(
        &self,
        id: &EventId,
        participants: &BTreeMap<Category, Vec<ParticipantEntry>>,
    ) -> Result<EventRecord, StoreError> {
        let mut fields = Record::new();
        fields.insert(
            "participantes".to_owned(),
            serde_json::to_value(participants).map_err(|error| StoreError::Serialize(error.to_string()))?,
        );
        decode(self.store.update_fields(id.as_str(), fields).await?)
    }

    pub async fn deactivate(&self, id: &EventId) -> Result<EventRecord, StoreError> {
        let mut fields = Record::new();
        fields.insert("ativa".to_owned(), Value::Bool(false));
        decode(self.store.update_fields(id.as_str(), fields).await?)
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<EventRecord>, StoreError> {
        Ok(decode_all(self.store.collection().name, self.store.list_recent(limit).await?))
    }

    pub async fn all(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(decode_all(self.store.collection().name, self.store.list_all().await?))
    }

    pub async fn delete(&self, ids: &[EventId]) -> Result<usize, StoreError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        self.store.delete_by_ids(&ids).await
    }

    pub async fn cleanup(&self, keep: usize) -> Result<usize, StoreError> {
        self.store.retain_recent(keep).await
    }
}

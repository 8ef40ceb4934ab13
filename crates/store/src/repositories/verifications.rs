use std::cmp::Reverse;
use std::sync::Arc;

use guildhall_core::clock;
use guildhall_core::domain::ids::UserId;
use guildhall_core::domain::verification::VerificationRecord;

use super::{decode, decode_all, encode};
use crate::{RecordStore, StoreError};

#[derive(Clone)]
pub struct VerificationRepository {
    store: Arc<dyn RecordStore>,
}

impl VerificationRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Inserts or replaces the member's record; the stored copy carries fresh stamps.
    pub async fn save(&self, record: &VerificationRecord) -> Result<VerificationRecord, StoreError> {
        decode(self.store.upsert(encode(record)?).await?)
    }

    pub async fn find(&self, user_id: UserId) -> Result<Option<VerificationRecord>, StoreError> {
        self.store.get_by_id(&user_id.to_string()).await?.map(decode).transpose()
    }

    pub async fn all(&self) -> Result<Vec<VerificationRecord>, StoreError> {
        Ok(decode_all(self.store.collection().name, self.store.list_all().await?))
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.store.list_all().await?.len())
    }

    /// Most recently written first. Records without a readable stamp sort last.
    pub async fn recent(&self, limit: usize) -> Result<Vec<VerificationRecord>, StoreError> {
        let mut records = self.all().await?;
        records.sort_by_key(|record| {
            Reverse(record.timestamp.as_deref().and_then(clock::parse_stamp))
        });
        records.truncate(limit);
        Ok(records)
    }
}

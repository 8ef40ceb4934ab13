use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::{Record, StoreError};

pub mod events;
pub mod verifications;

pub use events::EventRepository;
pub use verifications::VerificationRepository;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value).map_err(|error| StoreError::Serialize(error.to_string()))? {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::Serialize(format!("expected an object, got `{other}`"))),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(record)).map_err(|error| StoreError::Decode(error.to_string()))
}

/// Decodes every record it can; entries that no longer fit the typed shape
/// are logged and skipped so one bad row cannot hide the rest.
pub(crate) fn decode_all<T: DeserializeOwned>(collection: &str, records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match decode(record) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(
                    event_name = "store.record_skipped",
                    collection,
                    error = %error,
                    "skipping record that does not decode"
                );
                None
            }
        })
        .collect()
}

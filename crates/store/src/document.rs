use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use guildhall_core::clock;

use crate::{Record, StoreError};

/// Prune rule applied after each `put`: once the collection holds
/// `ceiling` records, only the newest `keep` survive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retention {
    pub ceiling: usize,
    pub keep: usize,
}

/// Shape of one persisted collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub id_field: &'static str,
    pub created_display_field: &'static str,
    pub retention: Option<Retention>,
}

pub const CREATED_FIELD: &str = "timestamp";
pub const UPDATED_FIELD: &str = "ultima_atualizacao";
pub const UPDATED_DISPLAY_FIELD: &str = "ultima_atualizacao_brasilia";

impl CollectionSpec {
    pub fn events(retention: Retention) -> Self {
        Self {
            name: "eventos",
            id_field: "event_id",
            created_display_field: "data_brasilia",
            retention: Some(retention),
        }
    }

    pub fn verifications() -> Self {
        Self { name: "verificacoes", id_field: "user_id", created_display_field: "data", retention: None }
    }

    pub fn record_id(&self, record: &Record) -> Option<String> {
        id_text(record.get(self.id_field)?)
    }

    fn matches(&self, record: &Record, id: &str) -> bool {
        self.record_id(record).is_some_and(|candidate| candidate == id)
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Reads the collection array out of a raw document. A missing collection key
/// is treated as empty; anything else that is not an array of objects is rejected.
pub fn parse(spec: &CollectionSpec, raw: &str, path: &Path) -> Result<Vec<Record>, StoreError> {
    let malformed = |message: String| StoreError::Malformed { path: path.to_path_buf(), message };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(raw).map_err(|error| malformed(error.to_string()))?;
    let Value::Object(mut root) = root else {
        return Err(malformed("top level is not an object".to_owned()));
    };

    match root.remove(spec.name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(record) => Ok(record),
                _ => Err(malformed(format!("`{}[{index}]` is not an object", spec.name))),
            })
            .collect(),
        Some(_) => Err(malformed(format!("`{}` is not an array", spec.name))),
    }
}

pub fn render(spec: &CollectionSpec, records: &[Record]) -> Result<String, StoreError> {
    let mut root = Map::new();
    root.insert(
        spec.name.to_owned(),
        Value::Array(records.iter().cloned().map(Value::Object).collect()),
    );
    serde_json::to_string_pretty(&Value::Object(root))
        .map_err(|error| StoreError::Serialize(error.to_string()))
}

pub fn put(
    spec: &CollectionSpec,
    records: &mut Vec<Record>,
    mut record: Record,
    now: DateTime<FixedOffset>,
) -> Result<usize, StoreError> {
    if spec.record_id(&record).is_none() {
        return Err(StoreError::MissingId { field: spec.id_field });
    }
    if !record.contains_key(CREATED_FIELD) {
        record.insert(CREATED_FIELD.to_owned(), Value::String(clock::stamp(now)));
        record.insert(spec.created_display_field.to_owned(), Value::String(clock::display(now)));
    }
    records.push(record);

    Ok(match spec.retention {
        Some(retention) if records.len() >= retention.ceiling => retain_recent(records, retention.keep),
        _ => 0,
    })
}

pub fn get(spec: &CollectionSpec, records: &[Record], id: &str) -> Option<Record> {
    records.iter().find(|record| spec.matches(record, id)).cloned()
}

pub fn update_fields(
    spec: &CollectionSpec,
    records: &mut [Record],
    id: &str,
    fields: Record,
    now: DateTime<FixedOffset>,
) -> Result<Record, StoreError> {
    let record = records
        .iter_mut()
        .find(|record| spec.matches(record, id))
        .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })?;

    for (key, value) in fields {
        if key == spec.id_field {
            continue;
        }
        record.insert(key, value);
    }
    record.insert(UPDATED_FIELD.to_owned(), Value::String(clock::stamp(now)));
    record.insert(UPDATED_DISPLAY_FIELD.to_owned(), Value::String(clock::display(now)));

    Ok(record.clone())
}

pub fn delete(spec: &CollectionSpec, records: &mut Vec<Record>, ids: &[String]) -> usize {
    let before = records.len();
    records.retain(|record| !ids.iter().any(|id| spec.matches(record, id)));
    before - records.len()
}

pub fn recent(records: &[Record], limit: usize) -> Vec<Record> {
    records.iter().rev().take(limit).cloned().collect()
}

/// Upserts always refresh the creation stamps, so `timestamp` reflects the
/// latest write for that id.
pub fn upsert(
    spec: &CollectionSpec,
    records: &mut Vec<Record>,
    mut record: Record,
    now: DateTime<FixedOffset>,
) -> Result<Record, StoreError> {
    let id = spec.record_id(&record).ok_or(StoreError::MissingId { field: spec.id_field })?;
    record.insert(spec.created_display_field.to_owned(), Value::String(clock::display(now)));
    record.insert(CREATED_FIELD.to_owned(), Value::String(clock::stamp(now)));

    match records.iter_mut().find(|existing| spec.matches(existing, &id)) {
        Some(existing) => *existing = record.clone(),
        None => records.push(record.clone()),
    }
    Ok(record)
}

pub fn retain_recent(records: &mut Vec<Record>, keep: usize) -> usize {
    let excess = records.len().saturating_sub(keep);
    records.drain(..excess);
    excess
}

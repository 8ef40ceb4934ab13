use std::sync::Arc;

use guildhall_core::config::AppConfig;
use guildhall_core::domain::event::EventRecord;
use guildhall_core::domain::ids::EventId;
use guildhall_store::document::{CollectionSpec, Retention};
use guildhall_store::{EventRepository, JsonFileStore, StoreError};
use serde::Serialize;

use crate::commands::{block_on, load_local_config, CommandResult};

#[derive(Debug, Serialize)]
struct EventSummary {
    event_id: String,
    title: String,
    time: String,
    active: bool,
    registered: usize,
    capacity: u32,
    created_at: String,
}

impl From<&EventRecord> for EventSummary {
    fn from(event: &EventRecord) -> Self {
        Self {
            event_id: event.event_id.to_string(),
            title: event.title.clone(),
            time: event.time.clone(),
            active: event.active,
            registered: event.total_registered(),
            capacity: event.total_capacity(),
            created_at: event.created_at.clone(),
        }
    }
}

async fn open(config: &AppConfig) -> Result<EventRepository, StoreError> {
    let retention = Retention {
        ceiling: config.storage.retention_ceiling,
        keep: config.storage.retention_keep,
    };
    let store =
        JsonFileStore::open(&config.storage.events_path, CollectionSpec::events(retention)).await?;
    Ok(EventRepository::new(Arc::new(store)))
}

pub fn list(limit: Option<usize>) -> CommandResult {
    const COMMAND: &str = "events.list";
    let config = match load_local_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let events = block_on(COMMAND, async {
        let repository = open(&config).await?;
        match limit {
            Some(limit) => repository.recent(limit).await,
            None => {
                let mut events = repository.all().await?;
                events.reverse();
                Ok(events)
            }
        }
    });

    match events {
        Ok(events) => {
            let summaries: Vec<EventSummary> = events.iter().map(EventSummary::from).collect();
            let data = serde_json::to_value(&summaries).ok();
            CommandResult::success_with_data(COMMAND, format!("{} event(s)", summaries.len()), data)
        }
        Err(failure) => failure,
    }
}

pub fn cleanup(keep: Option<usize>) -> CommandResult {
    const COMMAND: &str = "events.cleanup";
    let config = match load_local_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let keep = keep.unwrap_or(config.storage.retention_keep);

    let removed = block_on(COMMAND, async { open(&config).await?.cleanup(keep).await });

    match removed {
        Ok(removed) => CommandResult::success(
            COMMAND,
            format!("removed {removed} event(s), kept the {keep} most recent"),
        ),
        Err(failure) => failure,
    }
}

pub fn delete(ids: &[String]) -> CommandResult {
    const COMMAND: &str = "events.delete";
    let ids: Vec<EventId> = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(|id| EventId(id.to_owned()))
        .collect();
    if ids.is_empty() {
        return CommandResult::failure(COMMAND, "invalid_arguments", "no event ids given", 1);
    }

    let config = match load_local_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let deleted = block_on(COMMAND, async { open(&config).await?.delete(&ids).await });

    match deleted {
        Ok(deleted) => {
            CommandResult::success(COMMAND, format!("deleted {deleted} of {} event(s)", ids.len()))
        }
        Err(failure) => failure,
    }
}

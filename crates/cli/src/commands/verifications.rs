use std::sync::Arc;

use guildhall_core::domain::verification::{VerificationRecord, VerificationStats};
use guildhall_store::document::CollectionSpec;
use guildhall_store::{JsonFileStore, VerificationRepository};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::commands::{block_on, load_local_config, CommandResult};

#[derive(Debug, Serialize)]
struct VerificationSummary {
    user_id: String,
    name: String,
    server_nickname: Option<String>,
    vocation: Option<&'static str>,
    status: &'static str,
    recorded_at: Option<String>,
}

impl From<&VerificationRecord> for VerificationSummary {
    fn from(record: &VerificationRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            name: record.display_name().to_owned(),
            server_nickname: record.server_nickname.clone(),
            vocation: record.vocation.map(|vocation| vocation.name()),
            status: record.status.label(),
            recorded_at: record.recorded_at_display.clone(),
        }
    }
}

pub fn list(limit: usize) -> CommandResult {
    const COMMAND: &str = "verifications.list";
    let config = match load_local_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let records = block_on(COMMAND, async {
        let store =
            JsonFileStore::open(&config.storage.verifications_path, CollectionSpec::verifications())
                .await?;
        let repository = VerificationRepository::new(Arc::new(store));
        Ok((repository.all().await?, repository.recent(limit).await?))
    });

    match records {
        Ok((all, recent)) => {
            let recent: Vec<VerificationSummary> = recent.iter().map(VerificationSummary::from).collect();
            let data = serde_json::json!({ "stats": stats_json(&all), "records": recent });
            CommandResult::success_with_data(
                COMMAND,
                format!("{} record(s), showing {}", all.len(), recent.len()),
                Some(data),
            )
        }
        Err(failure) => failure,
    }
}

fn stats_json(records: &[VerificationRecord]) -> Value {
    let stats = VerificationStats::collect(records);
    let by_status: Map<String, Value> = stats
        .by_status
        .into_iter()
        .map(|(status, count)| (status.label().to_owned(), Value::from(count)))
        .collect();
    let by_vocation: Map<String, Value> = stats
        .by_vocation
        .into_iter()
        .map(|(vocation, count)| {
            let name = vocation.map_or("No vocation", |vocation| vocation.name());
            (name.to_owned(), Value::from(count))
        })
        .collect();
    serde_json::json!({ "by_status": by_status, "by_vocation": by_vocation })
}

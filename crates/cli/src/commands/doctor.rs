use std::path::Path;
use std::sync::Arc;

use guildhall_core::config::{AppConfig, LoadOptions};
use guildhall_store::document::{CollectionSpec, Retention};
use guildhall_store::{
    EventRepository, JsonFileStore, StoreError, VerificationRepository,
};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_token_shape(config.discord.token.expose_secret()));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("discord_token_shape", "configuration did not load"));
        }
    }

    // Storage checks only need the local settings, so they run even when the
    // token is missing.
    match AppConfig::load(LoadOptions { offline: true, ..LoadOptions::default() }) {
        Ok(config) => checks.extend(check_storage(&config)),
        Err(_) => {
            checks.push(skipped("events_document", "local configuration did not load"));
            checks.push(skipped("verifications_document", "local configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str, reason: &str) -> DoctorCheck {
    DoctorCheck { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
}

/// Bot tokens are three dot-separated segments.
fn check_token_shape(token: &str) -> DoctorCheck {
    let segments = token.trim().split('.').filter(|segment| !segment.is_empty()).count();
    if segments == 3 {
        DoctorCheck {
            name: "discord_token_shape",
            status: CheckStatus::Pass,
            details: "token has the expected three segments".to_string(),
        }
    } else {
        DoctorCheck {
            name: "discord_token_shape",
            status: CheckStatus::Fail,
            details: format!("token has {segments} segment(s); expected 3"),
        }
    }
}

fn check_storage(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let details = format!("failed to initialize async runtime: {error}");
            return vec![
                DoctorCheck { name: "events_document", status: CheckStatus::Fail, details: details.clone() },
                DoctorCheck { name: "verifications_document", status: CheckStatus::Fail, details },
            ];
        }
    };

    let retention = Retention {
        ceiling: config.storage.retention_ceiling,
        keep: config.storage.retention_keep,
    };
    let events_path = &config.storage.events_path;
    let verifications_path = &config.storage.verifications_path;

    runtime.block_on(async {
        let events = document_check("events_document", events_path, async {
            let store = JsonFileStore::open(events_path, CollectionSpec::events(retention)).await?;
            Ok(EventRepository::new(Arc::new(store)).all().await?.len())
        })
        .await;
        let verifications = document_check("verifications_document", verifications_path, async {
            let store =
                JsonFileStore::open(verifications_path, CollectionSpec::verifications()).await?;
            VerificationRepository::new(Arc::new(store)).count().await
        })
        .await;
        vec![events, verifications]
    })
}

async fn document_check(
    name: &'static str,
    path: &Path,
    read: impl std::future::Future<Output = Result<usize, StoreError>>,
) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("`{}` does not exist yet and will be created on first write", path.display()),
        };
    }

    match read.await {
        Ok(count) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("`{}` readable with {count} record(s)", path.display()),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

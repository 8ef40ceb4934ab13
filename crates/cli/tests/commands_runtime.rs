use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use guildhall_cli::commands::{config, doctor, events, verifications};
use serde_json::{json, Value};

const TOKEN: &str = "MTIzNDU2Nzg5MDEy.Gabcde.secretpart";

#[test]
fn config_redacts_token_and_attributes_sources() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_storage_env(dir.path(), &[("GUILDHALL_DISCORD_TOKEN", TOKEN)], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("discord.token = MTIz***"));
        assert!(!message.contains("secretpart"));
        assert!(message.contains("(source: env (GUILDHALL_DISCORD_TOKEN))"));
        assert!(message.contains("polls.organizer_role = Puxadores (source: default)"));
    });
}

#[test]
fn events_list_returns_newest_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_events(dir.path(), &["e-1", "e-2", "e-3"]);
    with_storage_env(dir.path(), &[], || {
        let result = events::list(None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "events.list");
        assert_eq!(payload["status"], "ok");
        let ids: Vec<&str> = payload["data"]
            .as_array()
            .expect("event list")
            .iter()
            .filter_map(|event| event["event_id"].as_str())
            .collect();
        assert_eq!(ids, vec!["e-3", "e-2", "e-1"]);
        assert_eq!(payload["data"][2]["registered"], 1);
        assert_eq!(payload["data"][2]["capacity"], 5);

        let limited = parse_payload(&events::list(Some(1)).output);
        assert_eq!(limited["message"], "1 event(s)");
    });
}

#[test]
fn events_cleanup_keeps_the_most_recent() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_events(dir.path(), &["e-1", "e-2", "e-3", "e-4"]);
    with_storage_env(dir.path(), &[], || {
        let result = events::cleanup(Some(2));
        assert_eq!(result.exit_code, 0);
        assert_eq!(
            parse_payload(&result.output)["message"],
            "removed 2 event(s), kept the 2 most recent"
        );

        let remaining = parse_payload(&events::list(None).output);
        assert_eq!(remaining["data"][0]["event_id"], "e-4");
        assert_eq!(remaining["data"][1]["event_id"], "e-3");
        assert_eq!(remaining["data"].as_array().map(Vec::len), Some(2));
    });
}

#[test]
fn events_delete_reports_how_many_ids_matched() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_events(dir.path(), &["e-1", "e-2"]);
    with_storage_env(dir.path(), &[], || {
        let result = events::delete(&["e-1".to_string(), "missing".to_string()]);
        assert_eq!(result.exit_code, 0);
        assert_eq!(parse_payload(&result.output)["message"], "deleted 1 of 2 event(s)");

        let empty = events::delete(&["  ".to_string()]);
        assert_eq!(empty.exit_code, 1);
        assert_eq!(parse_payload(&empty.output)["error_class"], "invalid_arguments");
    });
}

#[test]
fn storage_commands_fail_on_invalid_local_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_storage_env(dir.path(), &[("GUILDHALL_STORAGE_RETENTION_KEEP", "60")], || {
        let result = events::list(None);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn corrupt_document_is_a_storage_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("eventos.json"), "{ not json").expect("write");
    with_storage_env(dir.path(), &[], || {
        let result = events::list(None);
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "storage");
    });
}

#[test]
fn verifications_list_reports_stats_and_recent_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let document = json!({ "verificacoes": [
        {
            "user_id": 1, "nick_discord": "alpha", "nome_global": "Alpha",
            "nick_atual_servidor": "Alpha Knight", "vocacao": "EK",
            "status": "verificacao_concluida", "timestamp": "2025-03-10T10:00:00-03:00"
        },
        {
            "user_id": 2, "nick_discord": "beta", "nome_global": "Beta",
            "status": "verificacao_iniciada", "timestamp": "2025-03-12T10:00:00-03:00"
        }
    ] });
    fs::write(dir.path().join("verificacao.json"), document.to_string()).expect("write");

    with_storage_env(dir.path(), &[], || {
        let result = verifications::list(1);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "2 record(s), showing 1");
        assert_eq!(payload["data"]["records"][0]["name"], "beta");
        assert_eq!(payload["data"]["stats"]["by_status"]["✅ Completed"], 1);
        assert_eq!(payload["data"]["stats"]["by_vocation"]["Elite Knight"], 1);
        assert_eq!(payload["data"]["stats"]["by_vocation"]["No vocation"], 1);
    });
}

#[test]
fn doctor_checks_storage_even_without_a_token() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_events(dir.path(), &["e-1"]);
    with_storage_env(dir.path(), &[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        let status_of = |name: &str| {
            report["checks"]
                .as_array()
                .and_then(|checks| checks.iter().find(|check| check["name"] == name))
                .map(|check| check["status"].clone())
        };
        assert_eq!(status_of("config_validation"), Some(json!("fail")));
        assert_eq!(status_of("discord_token_shape"), Some(json!("skipped")));
        assert_eq!(status_of("events_document"), Some(json!("pass")));
        assert_eq!(status_of("verifications_document"), Some(json!("pass")));
    });
}

#[test]
fn doctor_passes_with_token_and_readable_storage() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_storage_env(dir.path(), &[("DISCORD_TOKEN", TOKEN)], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.starts_with("doctor: all readiness checks passed"));
        assert!(result.output.contains("- [ok] discord_token_shape"));
    });
}

fn write_events(dir: &Path, ids: &[&str]) {
    let events: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "event_id": id,
                "titulo": format!("Boss {id}"),
                "horario": "21h",
                "limites": { "TANKER": 1, "HEALER": 1, "DPS": 3, "RESERVA": 0 },
                "data_criacao": "2025-03-10T20:00:00-03:00",
                "autor_id": 10,
                "autor_nome": "lead",
                "canal_id": 20,
                "participantes": { "DPS": [{ "user_id": 30, "nome": "noctiis" }] }
            })
        })
        .collect();
    fs::write(dir.join("eventos.json"), json!({ "eventos": events }).to_string()).expect("write");
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_storage_env(dir: &Path, vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let events_path = dir.join("eventos.json");
    let verifications_path = dir.join("verificacao.json");
    let mut all_vars = vec![
        ("GUILDHALL_STORAGE_EVENTS_PATH", events_path.to_string_lossy().into_owned()),
        ("GUILDHALL_STORAGE_VERIFICATIONS_PATH", verifications_path.to_string_lossy().into_owned()),
    ];
    all_vars.extend(vars.iter().map(|(key, value)| (*key, value.to_string())));
    let borrowed: Vec<(&str, &str)> =
        all_vars.iter().map(|(key, value)| (*key, value.as_str())).collect();
    with_env(&borrowed, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "DISCORD_TOKEN",
        "GUILDHALL_DISCORD_TOKEN",
        "GUILDHALL_DISCORD_API_BASE_URL",
        "GUILDHALL_DISCORD_REQUEST_TIMEOUT_SECS",
        "GUILDHALL_STORAGE_EVENTS_PATH",
        "GUILDHALL_STORAGE_VERIFICATIONS_PATH",
        "GUILDHALL_STORAGE_RETENTION_CEILING",
        "GUILDHALL_STORAGE_RETENTION_KEEP",
        "GUILDHALL_POLLS_ORGANIZER_ROLE",
        "GUILDHALL_POLLS_SESSION_TTL_SECS",
        "GUILDHALL_ROLES_SESSION_TTL_SECS",
        "GUILDHALL_VERIFICATION_GUEST_ROLE",
        "GUILDHALL_SERVER_BIND_ADDRESS",
        "GUILDHALL_SERVER_HEALTH_CHECK_PORT",
        "GUILDHALL_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "GUILDHALL_LOGGING_LEVEL",
        "GUILDHALL_LOGGING_FORMAT",
        "GUILDHALL_LOG_LEVEL",
        "GUILDHALL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

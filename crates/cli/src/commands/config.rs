use std::env;
use std::fs;
use std::path::Path;

use guildhall_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions { offline: true, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let fields = [
        field(
            "discord.token",
            redact_token(config.discord.token.expose_secret()),
            &["GUILDHALL_DISCORD_TOKEN", "DISCORD_TOKEN"],
        ),
        field("discord.api_base_url", config.discord.api_base_url.clone(), &["GUILDHALL_DISCORD_API_BASE_URL"]),
        field(
            "discord.request_timeout_secs",
            config.discord.request_timeout_secs.to_string(),
            &["GUILDHALL_DISCORD_REQUEST_TIMEOUT_SECS"],
        ),
        field(
            "storage.events_path",
            config.storage.events_path.display().to_string(),
            &["GUILDHALL_STORAGE_EVENTS_PATH"],
        ),
        field(
            "storage.verifications_path",
            config.storage.verifications_path.display().to_string(),
            &["GUILDHALL_STORAGE_VERIFICATIONS_PATH"],
        ),
        field(
            "storage.retention_ceiling",
            config.storage.retention_ceiling.to_string(),
            &["GUILDHALL_STORAGE_RETENTION_CEILING"],
        ),
        field(
            "storage.retention_keep",
            config.storage.retention_keep.to_string(),
            &["GUILDHALL_STORAGE_RETENTION_KEEP"],
        ),
        field("polls.organizer_role", config.polls.organizer_role.clone(), &["GUILDHALL_POLLS_ORGANIZER_ROLE"]),
        field(
            "polls.session_ttl_secs",
            config.polls.session_ttl_secs.to_string(),
            &["GUILDHALL_POLLS_SESSION_TTL_SECS"],
        ),
        field(
            "roles.session_ttl_secs",
            config.roles.session_ttl_secs.to_string(),
            &["GUILDHALL_ROLES_SESSION_TTL_SECS"],
        ),
        field(
            "verification.guest_role",
            config.verification.guest_role.clone(),
            &["GUILDHALL_VERIFICATION_GUEST_ROLE"],
        ),
        field("server.bind_address", config.server.bind_address.clone(), &["GUILDHALL_SERVER_BIND_ADDRESS"]),
        field(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["GUILDHALL_SERVER_HEALTH_CHECK_PORT"],
        ),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["GUILDHALL_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["GUILDHALL_LOGGING_LEVEL", "GUILDHALL_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["GUILDHALL_LOGGING_FORMAT", "GUILDHALL_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields.iter().map(|field| render_line(field.key, &field.value, source(field.key, field.env_keys))),
    );

    CommandResult::success("config", lines.join("\n"))
}

struct ConfigField {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: impl ToString, env_keys: &'static [&'static str]) -> ConfigField {
    ConfigField { key, value: value.to_string(), env_keys }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let visible: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() > 12 {
        return format!("{visible}***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn tokens_never_render_in_full() {
        assert_eq!(redact_token("  "), "<empty>");
        assert_eq!(redact_token("short"), "<redacted>");
        assert_eq!(redact_token("MTIzNDU2Nzg5.Gabcde.secretpart"), "MTIz***");
    }

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: toml::Value = "[storage]\nevents_path = \"data/eventos.json\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "storage.events_path"));
        assert!(!contains_path(&doc, "storage.verifications_path"));
        assert!(!contains_path(&doc, "logging.level"));
    }
}

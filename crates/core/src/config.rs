use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "guildhall.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub polls: PollConfig,
    pub roles: RoleConfig,
    pub verification: VerificationConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: SecretString,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub events_path: PathBuf,
    pub verifications_path: PathBuf,
    pub retention_ceiling: usize,
    pub retention_keep: usize,
}

#[derive(Clone, Debug)]
pub struct PollConfig {
    pub organizer_role: String,
    pub session_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RoleConfig {
    pub session_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct VerificationConfig {
    pub guest_role: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub discord_token: Option<String>,
    pub events_path: Option<PathBuf>,
    pub verifications_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    /// Skip credential checks for tooling that only touches local storage.
    pub offline: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                token: String::new().into(),
                api_base_url: "https://discord.com/api/v10".to_string(),
                request_timeout_secs: 15,
            },
            storage: StorageConfig {
                events_path: PathBuf::from("eventos.json"),
                verifications_path: PathBuf::from("verificacao.json"),
                retention_ceiling: 50,
                retention_keep: 25,
            },
            polls: PollConfig { organizer_role: "Puxadores".to_string(), session_ttl_secs: 86_400 },
            roles: RoleConfig { session_ttl_secs: 300 },
            verification: VerificationConfig { guest_role: "Convidado".to_string() },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        if options.offline {
            config.validate_local()?;
        } else {
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(token_value) = discord.token {
                self.discord.token = token_value.into();
            }
            if let Some(api_base_url) = discord.api_base_url {
                self.discord.api_base_url = api_base_url;
            }
            if let Some(request_timeout_secs) = discord.request_timeout_secs {
                self.discord.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(storage) = patch.storage {
            if let Some(events_path) = storage.events_path {
                self.storage.events_path = events_path;
            }
            if let Some(verifications_path) = storage.verifications_path {
                self.storage.verifications_path = verifications_path;
            }
            if let Some(retention_ceiling) = storage.retention_ceiling {
                self.storage.retention_ceiling = retention_ceiling;
            }
            if let Some(retention_keep) = storage.retention_keep {
                self.storage.retention_keep = retention_keep;
            }
        }

        if let Some(polls) = patch.polls {
            if let Some(organizer_role) = polls.organizer_role {
                self.polls.organizer_role = organizer_role;
            }
            if let Some(session_ttl_secs) = polls.session_ttl_secs {
                self.polls.session_ttl_secs = session_ttl_secs;
            }
        }

        if let Some(session_ttl_secs) = patch.roles.and_then(|roles| roles.session_ttl_secs) {
            self.roles.session_ttl_secs = session_ttl_secs;
        }

        if let Some(guest_role) = patch.verification.and_then(|section| section.guest_role) {
            self.verification.guest_role = guest_role;
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let token = read_env("GUILDHALL_DISCORD_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = token {
            self.discord.token = value.into();
        }
        if let Some(value) = read_env("GUILDHALL_DISCORD_API_BASE_URL") {
            self.discord.api_base_url = value;
        }
        if let Some(value) = read_env("GUILDHALL_DISCORD_REQUEST_TIMEOUT_SECS") {
            self.discord.request_timeout_secs =
                parse_number("GUILDHALL_DISCORD_REQUEST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GUILDHALL_STORAGE_EVENTS_PATH") {
            self.storage.events_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("GUILDHALL_STORAGE_VERIFICATIONS_PATH") {
            self.storage.verifications_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("GUILDHALL_STORAGE_RETENTION_CEILING") {
            self.storage.retention_ceiling =
                parse_number("GUILDHALL_STORAGE_RETENTION_CEILING", &value)?;
        }
        if let Some(value) = read_env("GUILDHALL_STORAGE_RETENTION_KEEP") {
            self.storage.retention_keep = parse_number("GUILDHALL_STORAGE_RETENTION_KEEP", &value)?;
        }

        if let Some(value) = read_env("GUILDHALL_POLLS_ORGANIZER_ROLE") {
            self.polls.organizer_role = value;
        }
        if let Some(value) = read_env("GUILDHALL_POLLS_SESSION_TTL_SECS") {
            self.polls.session_ttl_secs = parse_number("GUILDHALL_POLLS_SESSION_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("GUILDHALL_ROLES_SESSION_TTL_SECS") {
            self.roles.session_ttl_secs = parse_number("GUILDHALL_ROLES_SESSION_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("GUILDHALL_VERIFICATION_GUEST_ROLE") {
            self.verification.guest_role = value;
        }

        if let Some(value) = read_env("GUILDHALL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("GUILDHALL_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_number("GUILDHALL_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("GUILDHALL_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_number("GUILDHALL_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("GUILDHALL_LOGGING_LEVEL").or_else(|| read_env("GUILDHALL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GUILDHALL_LOGGING_FORMAT").or_else(|| read_env("GUILDHALL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(discord_token) = overrides.discord_token {
            self.discord.token = discord_token.into();
        }
        if let Some(events_path) = overrides.events_path {
            self.storage.events_path = events_path;
        }
        if let Some(verifications_path) = overrides.verifications_path {
            self.storage.verifications_path = verifications_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        self.validate_local()
    }

    /// Everything except credentials.
    pub fn validate_local(&self) -> Result<(), ConfigError> {
        validate_api_base_url(&self.discord)?;
        validate_storage(&self.storage)?;
        validate_polls(&self.polls)?;
        validate_roles(&self.roles)?;
        validate_verification(&self.verification)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config/guildhall.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let token = discord.token.expose_secret();
    if token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.token is required. Set DISCORD_TOKEN (or GUILDHALL_DISCORD_TOKEN) to the bot token from https://discord.com/developers/applications > Your App > Bot".to_string(),
        ));
    }
    if token.starts_with("Bot ") {
        return Err(ConfigError::Validation(
            "discord.token must be the raw token; drop the `Bot ` prefix".to_string(),
        ));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(
            "discord.token must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

fn validate_api_base_url(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let url = discord.api_base_url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "discord.api_base_url must start with http:// or https://".to_string(),
        ));
    }
    if discord.request_timeout_secs == 0 || discord.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "discord.request_timeout_secs must be in range 1..=120".to_string(),
        ));
    }
    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> Result<(), ConfigError> {
    if storage.events_path.as_os_str().is_empty()
        || storage.verifications_path.as_os_str().is_empty()
    {
        return Err(ConfigError::Validation(
            "storage.events_path and storage.verifications_path must not be empty".to_string(),
        ));
    }
    if storage.events_path == storage.verifications_path {
        return Err(ConfigError::Validation(
            "storage.events_path and storage.verifications_path must point at different files"
                .to_string(),
        ));
    }
    if storage.retention_keep == 0 || storage.retention_keep >= storage.retention_ceiling {
        return Err(ConfigError::Validation(
            "storage.retention_keep must be greater than zero and below storage.retention_ceiling"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_polls(polls: &PollConfig) -> Result<(), ConfigError> {
    if polls.organizer_role.trim().is_empty() {
        return Err(ConfigError::Validation("polls.organizer_role must not be empty".to_string()));
    }
    if polls.session_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "polls.session_ttl_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_roles(roles: &RoleConfig) -> Result<(), ConfigError> {
    if roles.session_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "roles.session_ttl_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_verification(verification: &VerificationConfig) -> Result<(), ConfigError> {
    if verification.guest_role.trim().is_empty() {
        return Err(ConfigError::Validation(
            "verification.guest_role must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

pub fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    storage: Option<StoragePatch>,
    polls: Option<PollPatch>,
    roles: Option<RolePatch>,
    verification: Option<VerificationPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    events_path: Option<PathBuf>,
    verifications_path: Option<PathBuf>,
    retention_ceiling: Option<usize>,
    retention_keep: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PollPatch {
    organizer_role: Option<String>,
    session_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RolePatch {
    session_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct VerificationPatch {
    guest_role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    const TOKEN_VARS: [&str; 2] = ["GUILDHALL_DISCORD_TOKEN", "DISCORD_TOKEN"];

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("TEST_GUILDHALL_TOKEN", "token-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("guildhall.toml");
            fs::write(
                &path,
                r#"
[discord]
token = "${TEST_GUILDHALL_TOKEN}"

[polls]
organizer_role = "Raid Leads"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.discord.token.expose_secret() == "token-from-env",
                "token should be interpolated from the environment",
            )?;
            ensure(config.polls.organizer_role == "Raid Leads", "organizer role from file")?;
            ensure(config.verification.guest_role == "Convidado", "guest role default")?;
            Ok(())
        })();

        clear_vars(&["TEST_GUILDHALL_TOKEN"]);
        result
    }

    #[test]
    fn plain_discord_token_variable_is_accepted() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("DISCORD_TOKEN", "plain-token");
        env::set_var("GUILDHALL_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.discord.token.expose_secret() == "plain-token", "DISCORD_TOKEN used")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "json log format from env")?;
            Ok(())
        })();

        clear_vars(&["DISCORD_TOKEN", "GUILDHALL_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("GUILDHALL_DISCORD_TOKEN", "token-from-env");
        env::set_var("GUILDHALL_STORAGE_EVENTS_PATH", "env-events.json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("guildhall.toml");
            fs::write(
                &path,
                r#"
[discord]
token = "token-from-file"

[storage]
events_path = "file-events.json"
verifications_path = "file-verifications.json"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    events_path: Some(PathBuf::from("override-events.json")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.storage.events_path == PathBuf::from("override-events.json"),
                "override events path should win",
            )?;
            ensure(
                config.storage.verifications_path == PathBuf::from("file-verifications.json"),
                "file value should beat the default",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.discord.token.expose_secret() == "token-from-env",
                "env token should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["GUILDHALL_DISCORD_TOKEN", "GUILDHALL_STORAGE_EVENTS_PATH"]);
        result
    }

    #[test]
    fn missing_token_fails_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);

        let error = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => return Err("expected validation failure but config load succeeded".into()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("DISCORD_TOKEN")),
            "validation failure should point at DISCORD_TOKEN",
        )
    }

    #[test]
    fn offline_load_skips_credentials_but_checks_storage() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("GUILDHALL_STORAGE_RETENTION_KEEP", "60");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions { offline: true, ..LoadOptions::default() })
                .err()
                .ok_or_else(|| "retention keep above ceiling should fail".to_string())?;
            ensure(
                matches!(error, ConfigError::Validation(ref message) if message.contains("retention_keep")),
                "validation should mention retention_keep",
            )?;

            env::remove_var("GUILDHALL_STORAGE_RETENTION_KEEP");
            let config = AppConfig::load(LoadOptions { offline: true, ..LoadOptions::default() })
                .map_err(|err| format!("offline load failed: {err}"))?;
            ensure(config.storage.retention_ceiling == 50, "default ceiling")?;
            ensure(config.storage.retention_keep == 25, "default keep")?;
            Ok(())
        })();

        clear_vars(&["GUILDHALL_STORAGE_RETENTION_KEEP"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&TOKEN_VARS);
        env::set_var("GUILDHALL_DISCORD_TOKEN", "super-secret-token-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("super-secret-token-value"),
                "debug output should not contain the bot token",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["GUILDHALL_DISCORD_TOKEN"]);
        result
    }
}

use std::sync::Arc;

use guildhall_core::audit::TracingAuditSink;
use guildhall_core::config::{AppConfig, ConfigError, LoadOptions};
use guildhall_discord::commands::catalog;
use guildhall_discord::effects::EffectExecutor;
use guildhall_discord::events::InteractionEnvelope;
use guildhall_discord::gateway::{ChannelTransport, InteractionRunner, ReconnectPolicy};
use guildhall_discord::http::HttpDiscordPlatform;
use guildhall_discord::platform::{ChatPlatform, PlatformError};
use guildhall_discord::services::{build_dispatcher, ServiceDeps, ServiceSettings};
use guildhall_store::document::{CollectionSpec, Retention};
use guildhall_store::{EventRepository, JsonFileStore, StoreError, VerificationRepository};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Interactions buffered between the HTTP endpoint and the runner.
const INTERACTION_QUEUE_CAPACITY: usize = 64;

pub struct Application {
    pub config: AppConfig,
    pub events: EventRepository,
    pub verifications: VerificationRepository,
    pub interactions: mpsc::Sender<InteractionEnvelope>,
    pub runner: InteractionRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("storage initialization failed: {0}")]
    Store(#[from] StoreError),
    #[error("discord connection failed: {0}")]
    Platform(#[from] PlatformError),
}

#[allow(dead_code)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let retention = Retention {
        ceiling: config.storage.retention_ceiling,
        keep: config.storage.retention_keep,
    };
    let events_store =
        JsonFileStore::open(&config.storage.events_path, CollectionSpec::events(retention)).await?;
    let verifications_store =
        JsonFileStore::open(&config.storage.verifications_path, CollectionSpec::verifications())
            .await?;
    let events = EventRepository::new(Arc::new(events_store));
    let verifications = VerificationRepository::new(Arc::new(verifications_store));
    info!(
        event_name = "system.bootstrap.storage_ready",
        correlation_id = "bootstrap",
        events_path = %config.storage.events_path.display(),
        verifications_path = %config.storage.verifications_path.display(),
        "record stores opened"
    );

    let platform: Arc<dyn ChatPlatform> = Arc::new(HttpDiscordPlatform::connect(&config.discord).await?);
    match platform.register_commands(&catalog()).await {
        Ok(registered) => info!(
            event_name = "system.bootstrap.commands_registered",
            correlation_id = "bootstrap",
            registered,
            "slash commands registered"
        ),
        Err(error) => warn!(
            event_name = "system.bootstrap.commands_registered",
            correlation_id = "bootstrap",
            error = %error,
            "slash command registration failed; continuing with the existing catalog"
        ),
    }

    let deps = ServiceDeps {
        platform: platform.clone(),
        events: events.clone(),
        verifications: verifications.clone(),
        audit: Arc::new(TracingAuditSink),
        settings: ServiceSettings::from_config(&config),
    };
    let (interactions, transport) = ChannelTransport::new(INTERACTION_QUEUE_CAPACITY);
    let runner = InteractionRunner::new(
        Arc::new(transport),
        build_dispatcher(&deps),
        EffectExecutor::new(platform, events.clone()),
        ReconnectPolicy::default(),
    );

    Ok(Application { config, events, verifications, interactions, runner })
}

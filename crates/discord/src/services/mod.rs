//! Feature services. Each one owns the interactions of one [`Feature`] and
//! answers them with [`Effect`](crate::effects::Effect) lists.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use guildhall_core::audit::{AuditEvent, AuditSink};
use guildhall_core::config::AppConfig;
use guildhall_core::domain::ids::{ChannelId, RoleId};
use guildhall_core::errors::DomainError;
use guildhall_store::{EventRepository, VerificationRepository};

use crate::events::{EventDispatcher, HandlerError, InteractionEnvelope, OptionValue};
use crate::platform::{ChatPlatform, GuildSnapshot};

pub mod admin;
pub mod poll;
pub mod roles;
pub mod verification;

pub use admin::AdminService;
pub use poll::PollService;
pub use roles::RoleService;
pub use verification::VerificationService;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSettings {
    pub organizer_role: String,
    pub poll_ttl: Duration,
    pub role_session_ttl: Duration,
    pub guest_role: String,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            organizer_role: config.polls.organizer_role.clone(),
            poll_ttl: Duration::from_secs(config.polls.session_ttl_secs),
            role_session_ttl: Duration::from_secs(config.roles.session_ttl_secs),
            guest_role: config.verification.guest_role.clone(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct ServiceDeps {
    pub platform: Arc<dyn ChatPlatform>,
    pub events: EventRepository,
    pub verifications: VerificationRepository,
    pub audit: Arc<dyn AuditSink>,
    pub settings: ServiceSettings,
}

impl ServiceDeps {
    pub(crate) fn audit(&self, event: AuditEvent) {
        self.audit.emit(event);
    }

    /// Fails unless the actor holds the configured organizer role.
    pub(crate) async fn ensure_organizer(
        &self,
        envelope: &InteractionEnvelope,
    ) -> Result<GuildSnapshot, HandlerError> {
        let guild = self.platform.guild(envelope.guild()?).await?;
        let allowed = guild
            .role_named(&self.settings.organizer_role)
            .is_some_and(|role| envelope.actor.member.has_role(role.id));
        if !allowed {
            return Err(DomainError::PermissionDenied(
                "You do not have permission to use this command.".to_owned(),
            )
            .into());
        }
        Ok(guild)
    }

    pub(crate) fn ensure_admin(&self, envelope: &InteractionEnvelope) -> Result<(), HandlerError> {
        if envelope.actor.permissions.is_admin() {
            return Ok(());
        }
        Err(DomainError::PermissionDenied("Only administrators can use this command.".to_owned()).into())
    }
}

pub fn build_dispatcher(deps: &ServiceDeps) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(PollService::new(deps.clone()));
    dispatcher.register(RoleService::new(deps.clone()));
    dispatcher.register(VerificationService::new(deps.clone()));
    dispatcher.register(AdminService::new(deps.clone()));
    dispatcher
}

pub(crate) fn role_option(options: &BTreeMap<String, OptionValue>, name: &str) -> Option<RoleId> {
    match options.get(name) {
        Some(OptionValue::Role(role_id)) => Some(*role_id),
        _ => None,
    }
}

pub(crate) fn channel_option(options: &BTreeMap<String, OptionValue>, name: &str) -> Option<ChannelId> {
    match options.get(name) {
        Some(OptionValue::Channel(channel_id)) => Some(*channel_id),
        _ => None,
    }
}

#[cfg(test)]
impl ServiceDeps {
    pub(crate) fn in_memory(platform: Arc<crate::testing::FakePlatform>) -> Self {
        use guildhall_core::audit::InMemoryAuditSink;
        use guildhall_store::document::{CollectionSpec, Retention};
        use guildhall_store::InMemoryRecordStore;

        let events = InMemoryRecordStore::new(CollectionSpec::events(Retention { ceiling: 50, keep: 25 }));
        let verifications = InMemoryRecordStore::new(CollectionSpec::verifications());
        Self {
            platform,
            events: EventRepository::new(Arc::new(events)),
            verifications: VerificationRepository::new(Arc::new(verifications)),
            audit: Arc::new(InMemoryAuditSink::default()),
            settings: ServiceSettings::default(),
        }
    }
}

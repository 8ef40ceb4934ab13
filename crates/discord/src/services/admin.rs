use async_trait::async_trait;
use tracing::info;

use guildhall_core::audit::{AuditCategory, AuditEvent, AuditOutcome};

use crate::blocks::notice;
use crate::commands::{catalog, Feature, SYNC_COMMANDS};
use crate::effects::Effect;
use crate::events::{
    EventContext, HandlerError, HandlerResult, InteractionEnvelope, InteractionEvent, InteractionHandler,
};

use super::ServiceDeps;

/// Administrative maintenance commands.
pub struct AdminService {
    deps: ServiceDeps,
}

impl AdminService {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps }
    }

    async fn sync_commands(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_admin(envelope)?;
        let registered = self.deps.platform.register_commands(&catalog()).await?;
        info!(
            event_name = "commands.synced",
            correlation_id = %ctx.correlation_id,
            registered,
            "slash commands re-registered"
        );
        self.deps.audit(
            AuditEvent::new(
                &ctx.correlation_id,
                "commands.synced",
                AuditCategory::System,
                Some(envelope.actor.member.id),
                AuditOutcome::Success,
            )
            .with_metadata("registered", registered),
        );
        Ok(HandlerResult::effect(Effect::Reply(notice(format!(
            "✅ {registered} command(s) synchronized."
        )))))
    }
}

#[async_trait]
impl InteractionHandler for AdminService {
    fn feature(&self) -> Feature {
        Feature::Admin
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        match &envelope.event {
            InteractionEvent::SlashCommand { name, .. } if name == SYNC_COMMANDS => {
                self.sync_commands(envelope, ctx).await
            }
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

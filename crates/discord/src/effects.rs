use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use guildhall_core::domain::category::Category;
use guildhall_core::domain::event::ParticipantEntry;
use guildhall_core::domain::ids::{ChannelId, EventId, MessageId};
use guildhall_store::EventRepository;

use crate::blocks::{MessageTemplate, ModalTemplate};
use crate::events::InteractionEnvelope;
use crate::platform::{ChatPlatform, InteractionResponse, PlatformError};

/// Side effect requested by a handler. Handlers stay free of platform writes
/// for anything that can be described here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Message answering the interaction; later replies become follow-ups.
    Reply(MessageTemplate),
    /// Replaces the message holding the pressed component.
    UpdateSource(MessageTemplate),
    OpenModal(ModalTemplate),
    /// Edits the response of an interaction that was deferred by the handler.
    EditOriginal(MessageTemplate),
    EditMessage { channel_id: ChannelId, message_id: MessageId, message: MessageTemplate },
    PersistRoster { event_id: EventId, participants: BTreeMap<Category, Vec<ParticipantEntry>> },
}

impl Effect {
    fn name(&self) -> &'static str {
        match self {
            Self::Reply(_) => "reply",
            Self::UpdateSource(_) => "update_source",
            Self::OpenModal(_) => "open_modal",
            Self::EditOriginal(_) => "edit_original",
            Self::EditMessage { .. } => "edit_message",
            Self::PersistRoster { .. } => "persist_roster",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub applied: usize,
    pub failed: usize,
}

/// Applies effects in order. A failed effect is logged and the rest still run;
/// nothing already applied is rolled back.
#[derive(Clone)]
pub struct EffectExecutor {
    platform: Arc<dyn ChatPlatform>,
    events: EventRepository,
}

impl EffectExecutor {
    pub fn new(platform: Arc<dyn ChatPlatform>, events: EventRepository) -> Self {
        Self { platform, events }
    }

    pub fn platform(&self) -> &Arc<dyn ChatPlatform> {
        &self.platform
    }

    pub async fn execute(
        &self,
        envelope: &InteractionEnvelope,
        correlation_id: &str,
        effects: Vec<Effect>,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut responded = false;

        for effect in effects {
            let name = effect.name();
            let result = match effect {
                Effect::PersistRoster { event_id, participants } => {
                    match self.events.update_participants(&event_id, &participants).await {
                        Ok(_) => Ok(()),
                        Err(error) => {
                            warn!(
                                event_name = "poll.persist_failed",
                                correlation_id = %correlation_id,
                                event_id = %event_id,
                                error = %error,
                                "failed to persist poll roster; in-memory votes are kept"
                            );
                            report.failed += 1;
                            continue;
                        }
                    }
                }
                other => self.apply(envelope, other, &mut responded).await,
            };

            match result {
                Ok(()) => {
                    report.applied += 1;
                    debug!(
                        event_name = "interaction.effect_applied",
                        correlation_id = %correlation_id,
                        effect = name,
                        "applied interaction effect"
                    );
                }
                Err(error) => {
                    report.failed += 1;
                    warn!(
                        event_name = "interaction.effect_failed",
                        correlation_id = %correlation_id,
                        effect = name,
                        error = %error,
                        "interaction effect failed; continuing"
                    );
                }
            }
        }

        report
    }

    async fn apply(
        &self,
        envelope: &InteractionEnvelope,
        effect: Effect,
        responded: &mut bool,
    ) -> Result<(), PlatformError> {
        let interaction = &envelope.interaction;
        match effect {
            Effect::Reply(message) if *responded => self.platform.followup(interaction, &message).await,
            Effect::Reply(message) => {
                *responded = true;
                self.platform.respond(interaction, InteractionResponse::Message(message)).await
            }
            Effect::UpdateSource(message) if *responded => {
                self.platform.edit_original(interaction, &message).await
            }
            Effect::UpdateSource(message) => {
                *responded = true;
                self.platform.respond(interaction, InteractionResponse::UpdateMessage(message)).await
            }
            Effect::OpenModal(modal) => {
                *responded = true;
                self.platform.respond(interaction, InteractionResponse::Modal(modal)).await
            }
            Effect::EditOriginal(message) => self.platform.edit_original(interaction, &message).await,
            Effect::EditMessage { channel_id, message_id, message } => {
                self.platform.edit_message(channel_id, message_id, &message).await
            }
            Effect::PersistRoster { .. } => Ok(()),
        }
    }
}

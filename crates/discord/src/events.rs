use std::{collections::BTreeMap, collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use guildhall_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId};
use guildhall_core::domain::member::{Member, Permissions};
use guildhall_core::errors::{ApplicationError, DomainError, InterfaceError};
use guildhall_store::StoreError;

use crate::commands::{command_feature, ComponentRoute, Feature};
use crate::effects::Effect;
use crate::platform::{InteractionRef, PlatformError};

/// One decoded interaction, as delivered by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionEnvelope {
    pub interaction: InteractionRef,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub actor: Actor,
    pub event: InteractionEvent,
}

impl InteractionEnvelope {
    pub fn guild(&self) -> Result<GuildId, HandlerError> {
        self.guild_id.ok_or_else(|| {
            DomainError::InvalidInput("This only works inside a server.".to_owned()).into()
        })
    }
}

/// The member who triggered the interaction, with the permissions the
/// platform computed for them in the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub member: Member,
    pub permissions: Permissions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Role(RoleId),
    Channel(ChannelId),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentAction {
    pub custom_id: String,
    pub message_id: MessageId,
    /// Picked values for select menus; empty for buttons.
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionEvent {
    SlashCommand { name: String, options: BTreeMap<String, OptionValue> },
    Component(ComponentAction),
    ModalSubmit { custom_id: String, fields: BTreeMap<String, String> },
    Unsupported { kind: String },
}

impl InteractionEvent {
    pub fn feature(&self) -> Feature {
        match self {
            Self::SlashCommand { name, .. } => command_feature(name),
            Self::Component(ComponentAction { custom_id, .. })
            | Self::ModalSubmit { custom_id, .. } => {
                ComponentRoute::parse(custom_id).map_or(Feature::Unsupported, ComponentRoute::feature)
            }
            Self::Unsupported { .. } => Feature::Unsupported,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::SlashCommand { name, .. } => name,
            Self::Component(ComponentAction { custom_id, .. })
            | Self::ModalSubmit { custom_id, .. } => custom_id,
            Self::Unsupported { kind } => kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(Vec<Effect>),
    Ignored,
}

impl HandlerResult {
    pub fn effect(effect: Effect) -> Self {
        Self::Responded(vec![effect])
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed interaction: {0}")]
    Malformed(String),
}

impl From<DomainError> for HandlerError {
    fn from(value: DomainError) -> Self {
        Self::Application(ApplicationError::Domain(value))
    }
}

impl HandlerError {
    pub fn into_interface(self, correlation_id: &str) -> InterfaceError {
        match self {
            Self::Application(error) => error.into_interface(correlation_id),
            Self::Store(error) => ApplicationError::from(error).into_interface(correlation_id),
            Self::Platform(PlatformError::Forbidden(_)) => InterfaceError::Forbidden {
                message: "I do not have permission to do that. Contact an administrator.".to_owned(),
                correlation_id: correlation_id.to_owned(),
            },
            Self::Platform(error) => {
                ApplicationError::Transport(error.to_string()).into_interface(correlation_id)
            }
            Self::Malformed(_) => InterfaceError::BadRequest {
                message: "That interaction is no longer valid. Run the command again.".to_owned(),
                correlation_id: correlation_id.to_owned(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

#[async_trait]
pub trait InteractionHandler: Send + Sync {
    fn feature(&self) -> Feature;
    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<Feature, Arc<dyn InteractionHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: InteractionHandler + 'static,
    {
        self.handlers.insert(handler.feature(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.feature()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use guildhall_core::domain::ids::MessageId;
    use guildhall_core::errors::{DomainError, InterfaceError};

    use super::{
        ComponentAction, EventContext, EventDispatcher, HandlerError, HandlerResult,
        InteractionEnvelope, InteractionEvent, InteractionHandler,
    };
    use crate::blocks::notice;
    use crate::commands::Feature;
    use crate::effects::Effect;
    use crate::platform::PlatformError;
    use crate::testing::envelope;

    struct EchoHandler;

    #[async_trait]
    impl InteractionHandler for EchoHandler {
        fn feature(&self) -> Feature {
            Feature::Polls
        }

        async fn handle(
            &self,
            envelope: &InteractionEnvelope,
            _ctx: &EventContext,
        ) -> Result<HandlerResult, HandlerError> {
            Ok(HandlerResult::effect(Effect::Reply(notice(envelope.event.label()))))
        }
    }

    fn component(custom_id: &str) -> InteractionEvent {
        InteractionEvent::Component(ComponentAction {
            custom_id: custom_id.to_owned(),
            message_id: MessageId(5),
            values: Vec::new(),
        })
    }

    #[tokio::test]
    async fn routes_by_feature_and_ignores_the_rest() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(EchoHandler);
        let ctx = EventContext::default();

        let vote = dispatcher.dispatch(&envelope(1, component("poll:vote:DPS")), &ctx).await;
        assert_eq!(
            vote.expect("dispatch"),
            HandlerResult::effect(Effect::Reply(notice("poll:vote:DPS")))
        );

        let verify = dispatcher.dispatch(&envelope(1, component("verify:start")), &ctx).await;
        assert_eq!(verify.expect("dispatch"), HandlerResult::Ignored);

        let unknown = dispatcher.dispatch(&envelope(1, component("legacy_button")), &ctx).await;
        assert_eq!(unknown.expect("dispatch"), HandlerResult::Ignored);
        assert_eq!(dispatcher.handler_count(), 1);
    }

    #[test]
    fn platform_refusals_become_forbidden_replies() {
        let error = HandlerError::Platform(PlatformError::Forbidden("Missing Permissions".into()));
        let interface = error.into_interface("ix-1");
        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert_eq!(interface.correlation_id(), "ix-1");

        let full = HandlerError::from(DomainError::InvalidInput("bad".into())).into_interface("ix-2");
        assert_eq!(full.user_message(), "❌ bad");
    }
}

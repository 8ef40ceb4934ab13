use async_trait::async_trait;
use thiserror::Error;

use guildhall_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use guildhall_core::domain::member::{find_role_by_name, GuildRole, Member};
use guildhall_core::roles::MemberOutcome;

use crate::blocks::{MessageTemplate, ModalTemplate};
use crate::commands::CommandSpec;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("platform refused the request: {0}")]
    Forbidden(String),
    #[error("platform returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("unexpected platform failure: {0}")]
    Unexpected(String),
}

impl PlatformError {
    /// How a failed role edit is reported back to the moderator.
    pub fn member_outcome(&self) -> MemberOutcome {
        match self {
            Self::Forbidden(_) => MemberOutcome::Forbidden,
            Self::Http { status: 404, .. } => MemberOutcome::NotFound,
            Self::Http { .. } => MemberOutcome::HttpError,
            Self::Unexpected(_) => MemberOutcome::Unexpected,
        }
    }
}

/// Handle needed to answer one interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InteractionRef {
    pub id: String,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionResponse {
    Message(MessageTemplate),
    /// Replaces the message the pressed component belongs to.
    UpdateMessage(MessageTemplate),
    Modal(ModalTemplate),
    /// Acknowledges a component press; the message is edited later.
    DeferredUpdate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub id: GuildId,
    pub owner_id: UserId,
    pub roles: Vec<GuildRole>,
}

impl GuildSnapshot {
    pub fn role(&self, id: RoleId) -> Option<&GuildRole> {
        self.roles.iter().find(|role| role.id == id)
    }

    pub fn role_named(&self, name: &str) -> Option<&GuildRole> {
        find_role_by_name(&self.roles, name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub user_id: UserId,
    pub username: String,
}

/// Outbound calls the bot makes against the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn current_user(&self) -> Result<BotIdentity, PlatformError>;

    async fn respond(
        &self,
        interaction: &InteractionRef,
        response: InteractionResponse,
    ) -> Result<(), PlatformError>;

    async fn followup(
        &self,
        interaction: &InteractionRef,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError>;

    /// Edits the message a deferred interaction belongs to.
    async fn edit_original(
        &self,
        interaction: &InteractionRef,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError>;

    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageId, PlatformError>;

    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError>;

    async fn guild(&self, guild_id: GuildId) -> Result<GuildSnapshot, PlatformError>;

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Member>, PlatformError>;

    async fn list_members(&self, guild_id: GuildId) -> Result<Vec<Member>, PlatformError>;

    async fn bot_member(&self, guild_id: GuildId) -> Result<Member, PlatformError>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn set_nickname(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Replaces the registered slash commands, returning how many are live.
    async fn register_commands(&self, commands: &[CommandSpec]) -> Result<usize, PlatformError>;
}

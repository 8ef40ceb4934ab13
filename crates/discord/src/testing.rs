//! Recording fake of the chat platform plus fixture builders for handler tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use guildhall_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use guildhall_core::domain::member::{GuildRole, Member, Permissions};

use crate::blocks::MessageTemplate;
use crate::commands::CommandSpec;
use crate::events::{Actor, InteractionEnvelope, InteractionEvent};
use crate::platform::{
    BotIdentity, ChatPlatform, GuildSnapshot, InteractionRef, InteractionResponse, PlatformError,
};

pub const GUILD: GuildId = GuildId(100);
pub const CHANNEL: ChannelId = ChannelId(200);
pub const BOT: UserId = UserId(999);
pub const OWNER: UserId = UserId(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformCall {
    Respond(InteractionResponse),
    Followup(MessageTemplate),
    EditOriginal(MessageTemplate),
    SendMessage { channel_id: ChannelId, message: MessageTemplate },
    EditMessage { channel_id: ChannelId, message_id: MessageId, message: MessageTemplate },
    AddRole { user_id: UserId, role_id: RoleId },
    RemoveRole { user_id: UserId, role_id: RoleId },
    SetNickname { user_id: UserId, nickname: String },
    RegisterCommands(usize),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<PlatformCall>,
    roles: Vec<GuildRole>,
    members: BTreeMap<UserId, Member>,
    role_failures: HashMap<UserId, PlatformError>,
    nickname_failure: Option<PlatformError>,
    fail_edits: bool,
    next_message_id: u64,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    /// A guild with `@everyone`, a bot member holding `Bot` at position 50
    /// and the given roles.
    pub async fn with_guild(roles: Vec<GuildRole>) -> Self {
        let platform = Self::default();
        {
            let mut state = platform.state.lock().await;
            state.roles.push(role(GUILD.0, "@everyone", 0));
            state.roles.push(GuildRole {
                permissions: Permissions::MANAGE_ROLES,
                ..role(998, "Bot", 50)
            });
            state.roles.extend(roles);
            state.members.insert(BOT, GuildMemberBuilder::new(BOT.0, "guildhall").roles(&[998]).bot().build());
        }
        platform
    }

    pub async fn add_member(&self, member: Member) {
        self.state.lock().await.members.insert(member.id, member);
    }

    pub async fn fail_role_edits_for(&self, user_id: UserId, error: PlatformError) {
        self.state.lock().await.role_failures.insert(user_id, error);
    }

    pub async fn fail_nickname(&self, error: PlatformError) {
        self.state.lock().await.nickname_failure = Some(error);
    }

    pub async fn fail_edits(&self) {
        self.state.lock().await.fail_edits = true;
    }

    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn member_snapshot(&self, user_id: UserId) -> Option<Member> {
        self.state.lock().await.members.get(&user_id).cloned()
    }

    async fn record(&self, call: PlatformCall) {
        self.state.lock().await.calls.push(call);
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn current_user(&self) -> Result<BotIdentity, PlatformError> {
        Ok(BotIdentity { user_id: BOT, username: "guildhall".to_owned() })
    }

    async fn respond(
        &self,
        _interaction: &InteractionRef,
        response: InteractionResponse,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Respond(response)).await;
        Ok(())
    }

    async fn followup(
        &self,
        _interaction: &InteractionRef,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::Followup(message.clone())).await;
        Ok(())
    }

    async fn edit_original(
        &self,
        _interaction: &InteractionRef,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError> {
        self.record(PlatformCall::EditOriginal(message.clone())).await;
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.state.lock().await;
        state.calls.push(PlatformCall::SendMessage { channel_id, message: message.clone() });
        state.next_message_id += 1;
        Ok(MessageId(5_000 + state.next_message_id))
    }

    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        if state.fail_edits {
            return Err(PlatformError::Http { status: 404, message: "Unknown Message".to_owned() });
        }
        state.calls.push(PlatformCall::EditMessage { channel_id, message_id, message: message.clone() });
        Ok(())
    }

    async fn guild(&self, guild_id: GuildId) -> Result<GuildSnapshot, PlatformError> {
        let state = self.state.lock().await;
        Ok(GuildSnapshot { id: guild_id, owner_id: OWNER, roles: state.roles.clone() })
    }

    async fn member(&self, _guild_id: GuildId, user_id: UserId) -> Result<Option<Member>, PlatformError> {
        Ok(self.state.lock().await.members.get(&user_id).cloned())
    }

    async fn list_members(&self, _guild_id: GuildId) -> Result<Vec<Member>, PlatformError> {
        Ok(self.state.lock().await.members.values().cloned().collect())
    }

    async fn bot_member(&self, _guild_id: GuildId) -> Result<Member, PlatformError> {
        self.state
            .lock()
            .await
            .members
            .get(&BOT)
            .cloned()
            .ok_or_else(|| PlatformError::Unexpected("bot member missing".to_owned()))
    }

    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.role_failures.get(&user_id) {
            return Err(error.clone());
        }
        state.calls.push(PlatformCall::AddRole { user_id, role_id });
        if let Some(member) = state.members.get_mut(&user_id) {
            member.role_ids.push(role_id);
        }
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.role_failures.get(&user_id) {
            return Err(error.clone());
        }
        state.calls.push(PlatformCall::RemoveRole { user_id, role_id });
        if let Some(member) = state.members.get_mut(&user_id) {
            member.role_ids.retain(|id| *id != role_id);
        }
        Ok(())
    }

    async fn set_nickname(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        nickname: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        if let Some(error) = state.nickname_failure.clone() {
            return Err(error);
        }
        state.calls.push(PlatformCall::SetNickname { user_id, nickname: nickname.to_owned() });
        if let Some(member) = state.members.get_mut(&user_id) {
            member.nickname = Some(nickname.to_owned());
        }
        Ok(())
    }

    async fn register_commands(&self, commands: &[CommandSpec]) -> Result<usize, PlatformError> {
        self.record(PlatformCall::RegisterCommands(commands.len())).await;
        Ok(commands.len())
    }
}

pub fn role(id: u64, name: &str, position: i64) -> GuildRole {
    GuildRole {
        id: RoleId(id),
        name: name.to_owned(),
        position,
        managed: false,
        color: 0,
        permissions: Permissions::default(),
    }
}

pub struct GuildMemberBuilder {
    member: Member,
}

impl GuildMemberBuilder {
    pub fn new(id: u64, username: &str) -> Self {
        Self {
            member: Member {
                id: UserId(id),
                username: username.to_owned(),
                global_name: None,
                nickname: None,
                role_ids: Vec::new(),
                bot: false,
            },
        }
    }

    pub fn roles(mut self, roles: &[u64]) -> Self {
        self.member.role_ids = roles.iter().copied().map(RoleId).collect();
        self
    }

    pub fn nickname(mut self, nickname: &str) -> Self {
        self.member.nickname = Some(nickname.to_owned());
        self
    }

    pub fn bot(mut self) -> Self {
        self.member.bot = true;
        self
    }

    pub fn build(self) -> Member {
        self.member
    }
}

pub fn member(id: u64, username: &str, roles: &[u64]) -> Member {
    GuildMemberBuilder::new(id, username).roles(roles).build()
}

/// Envelope from a plain member without special permissions.
pub fn envelope(user_id: u64, event: InteractionEvent) -> InteractionEnvelope {
    envelope_as(member(user_id, &format!("user{user_id}"), &[]), Permissions::default(), event)
}

pub fn envelope_as(member: Member, permissions: Permissions, event: InteractionEvent) -> InteractionEnvelope {
    InteractionEnvelope {
        interaction: InteractionRef {
            id: format!("ix-{}", member.id),
            token: "token".to_owned(),
        },
        guild_id: Some(GUILD),
        channel_id: CHANNEL,
        actor: Actor { member, permissions },
        event,
    }
}

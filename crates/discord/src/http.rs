use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{debug, info};

use guildhall_core::config::DiscordConfig;
use guildhall_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use guildhall_core::domain::member::Member;

use crate::blocks::MessageTemplate;
use crate::commands::CommandSpec;
use crate::platform::{
    BotIdentity, ChatPlatform, GuildSnapshot, InteractionRef, InteractionResponse, PlatformError,
};
use crate::wire::{self, WireError};

const MEMBER_PAGE_SIZE: usize = 1000;
const AUDIT_REASON_HEADER: &str = "X-Audit-Log-Reason";

impl From<WireError> for PlatformError {
    fn from(error: WireError) -> Self {
        Self::Unexpected(error.to_string())
    }
}

/// REST client for the Discord HTTP API, authenticated as the bot.
pub struct HttpDiscordPlatform {
    client: Client,
    base_url: String,
    application_id: u64,
    identity: BotIdentity,
}

impl HttpDiscordPlatform {
    /// Builds the client and checks the token by resolving the bot user and
    /// its application.
    pub async fn connect(config: &DiscordConfig) -> Result<Self, PlatformError> {
        let mut authorization =
            HeaderValue::from_str(&format!("Bot {}", config.token.expose_secret()))
                .map_err(|_| PlatformError::Unexpected("token contains invalid characters".to_owned()))?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("DiscordBot (guildhall, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()
            .map_err(|error| PlatformError::Unexpected(error.to_string()))?;

        let mut platform = Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            application_id: 0,
            identity: BotIdentity { user_id: UserId(0), username: String::new() },
        };

        platform.identity = wire::decode_user(platform.fetch(Method::GET, "/users/@me").await?)?;
        let application = platform.fetch(Method::GET, "/oauth2/applications/@me").await?;
        platform.application_id = wire::decode_snowflake_field(&application, "id")?;

        info!(
            event_name = "discord.connected",
            bot_user_id = %platform.identity.user_id,
            bot_username = %platform.identity.username,
            application_id = platform.application_id,
            "authenticated against the Discord API"
        );
        Ok(platform)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base_url))
    }

    async fn fetch(&self, method: Method, path: &str) -> Result<Value, PlatformError> {
        required(self.send(self.request(method, path)).await?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Value>, PlatformError> {
        let response =
            request.send().await.map_err(|error| PlatformError::Unexpected(error.to_string()))?;
        let status = response.status();
        let body =
            response.text().await.map_err(|error| PlatformError::Unexpected(error.to_string()))?;

        if !status.is_success() {
            return Err(classify(status, &body));
        }
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|error| PlatformError::Unexpected(format!("invalid JSON from Discord: {error}")))
    }

    fn with_reason(request: RequestBuilder, reason: &str) -> RequestBuilder {
        match HeaderValue::from_str(reason) {
            Ok(value) => request.header(AUDIT_REASON_HEADER, value),
            Err(_) => request,
        }
    }

    fn webhook_path(&self, interaction: &InteractionRef) -> String {
        format!("/webhooks/{}/{}", self.application_id, interaction.token)
    }
}

fn required(value: Option<Value>) -> Result<Value, PlatformError> {
    value.ok_or_else(|| PlatformError::Unexpected("empty response from Discord".to_owned()))
}

/// Maps a failed HTTP status onto the platform error taxonomy.
fn classify(status: StatusCode, body: &str) -> PlatformError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.chars().take(200).collect());
    if status == StatusCode::FORBIDDEN {
        PlatformError::Forbidden(message)
    } else {
        PlatformError::Http { status: status.as_u16(), message }
    }
}

#[async_trait]
impl ChatPlatform for HttpDiscordPlatform {
    async fn current_user(&self) -> Result<BotIdentity, PlatformError> {
        Ok(self.identity.clone())
    }

    async fn respond(
        &self,
        interaction: &InteractionRef,
        response: InteractionResponse,
    ) -> Result<(), PlatformError> {
        let path = format!("/interactions/{}/{}/callback", interaction.id, interaction.token);
        let body = wire::interaction_response(&response);
        self.send(self.request(Method::POST, &path).json(&body)).await.map(|_| ())
    }

    async fn followup(
        &self,
        interaction: &InteractionRef,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError> {
        let path = self.webhook_path(interaction);
        self.send(self.request(Method::POST, &path).json(&wire::message_body(message))).await.map(|_| ())
    }

    async fn edit_original(
        &self,
        interaction: &InteractionRef,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError> {
        let path = format!("{}/messages/@original", self.webhook_path(interaction));
        self.send(self.request(Method::PATCH, &path).json(&wire::edit_body(message))).await.map(|_| ())
    }

    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageId, PlatformError> {
        let path = format!("/channels/{channel_id}/messages");
        let body = wire::message_body(message);
        let created = required(self.send(self.request(Method::POST, &path).json(&body)).await?)?;
        Ok(wire::decode_message_id(created)?)
    }

    async fn edit_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        message: &MessageTemplate,
    ) -> Result<(), PlatformError> {
        let path = format!("/channels/{channel_id}/messages/{message_id}");
        self.send(self.request(Method::PATCH, &path).json(&wire::edit_body(message))).await.map(|_| ())
    }

    async fn guild(&self, guild_id: GuildId) -> Result<GuildSnapshot, PlatformError> {
        Ok(wire::decode_guild(self.fetch(Method::GET, &format!("/guilds/{guild_id}")).await?)?)
    }

    async fn member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<Member>, PlatformError> {
        match self.fetch(Method::GET, &format!("/guilds/{guild_id}/members/{user_id}")).await {
            Ok(raw) => Ok(Some(wire::decode_member(raw)?)),
            Err(PlatformError::Http { status: 404, .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn list_members(&self, guild_id: GuildId) -> Result<Vec<Member>, PlatformError> {
        let mut members = Vec::new();
        let mut after = UserId(0);
        loop {
            let path =
                format!("/guilds/{guild_id}/members?limit={MEMBER_PAGE_SIZE}&after={after}");
            let page = wire::decode_members(self.fetch(Method::GET, &path).await?)?;
            let fetched = page.len();
            if let Some(last) = page.iter().map(|member| member.id).max() {
                after = last;
            }
            members.extend(page);
            debug!(
                event_name = "discord.members_page",
                guild_id = %guild_id,
                fetched,
                total = members.len(),
                "fetched member page"
            );
            if fetched < MEMBER_PAGE_SIZE {
                return Ok(members);
            }
        }
    }

    async fn bot_member(&self, guild_id: GuildId) -> Result<Member, PlatformError> {
        self.member(guild_id, self.identity.user_id)
            .await?
            .ok_or_else(|| PlatformError::Unexpected("the bot is not a member of this guild".to_owned()))
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}");
        self.send(Self::with_reason(self.request(Method::PUT, &path), reason)).await.map(|_| ())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/guilds/{guild_id}/members/{user_id}/roles/{role_id}");
        self.send(Self::with_reason(self.request(Method::DELETE, &path), reason)).await.map(|_| ())
    }

    async fn set_nickname(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        nickname: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let path = format!("/guilds/{guild_id}/members/{user_id}");
        let request = self.request(Method::PATCH, &path).json(&json!({ "nick": nickname }));
        self.send(Self::with_reason(request, reason)).await.map(|_| ())
    }

    async fn register_commands(&self, commands: &[CommandSpec]) -> Result<usize, PlatformError> {
        let path = format!("/applications/{}/commands", self.application_id);
        let body: Vec<Value> = commands.iter().map(wire::command_body).collect();
        let registered = required(self.send(self.request(Method::PUT, &path).json(&body)).await?)?;
        Ok(registered.as_array().map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::classify;
    use crate::platform::PlatformError;

    #[test]
    fn forbidden_and_other_statuses_are_classified() {
        assert_eq!(
            classify(StatusCode::FORBIDDEN, r#"{"message": "Missing Permissions", "code": 50013}"#),
            PlatformError::Forbidden("Missing Permissions".to_owned())
        );
        assert_eq!(
            classify(StatusCode::NOT_FOUND, r#"{"message": "Unknown Member", "code": 10007}"#),
            PlatformError::Http { status: 404, message: "Unknown Member".to_owned() }
        );
        assert_eq!(
            classify(StatusCode::BAD_GATEWAY, "upstream down"),
            PlatformError::Http { status: 502, message: "upstream down".to_owned() }
        );
    }
}

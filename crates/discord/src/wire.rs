//! Discord JSON shapes: inbound interactions and REST objects, outbound
//! message bodies, interaction callbacks and command definitions.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use guildhall_core::domain::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use guildhall_core::domain::member::{GuildRole, Member, Permissions};

use crate::blocks::{
    ActionRow, Button, ButtonStyle, Component, Embed, InputStyle, MessageTemplate, ModalTemplate,
    SelectMenu,
};
use crate::commands::{CommandSpec, OptionKind};
use crate::events::{
    Actor, ComponentAction, InteractionEnvelope, InteractionEvent, OptionValue,
};
use crate::platform::{BotIdentity, GuildSnapshot, InteractionRef, InteractionResponse};

const EPHEMERAL_FLAG: u64 = 1 << 6;

const INTERACTION_PING: u8 = 1;
const INTERACTION_COMMAND: u8 = 2;
const INTERACTION_COMPONENT: u8 = 3;
const INTERACTION_MODAL_SUBMIT: u8 = 5;

const OPTION_STRING: u8 = 3;
const OPTION_CHANNEL: u8 = 7;
const OPTION_ROLE: u8 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("invalid payload: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for WireError {
    fn from(error: serde_json::Error) -> Self {
        Self::Invalid(error.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Ping,
    Interaction(InteractionEnvelope),
}

/// Snowflakes arrive as strings but older fixtures use bare numbers.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum Snowflake {
    Text(String),
    Number(u64),
}

impl Snowflake {
    fn value(&self) -> Result<u64, WireError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(text) => {
                text.parse().map_err(|_| WireError::Invalid(format!("`{text}` is not a snowflake")))
            }
        }
    }
}

#[derive(Deserialize)]
struct RawInteraction {
    id: String,
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    guild_id: Option<Snowflake>,
    #[serde(default)]
    channel_id: Option<Snowflake>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    data: Option<RawData>,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMember {
    user: RawUser,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<Snowflake>,
    #[serde(default)]
    permissions: Option<String>,
}

#[derive(Deserialize)]
struct RawUser {
    id: Snowflake,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

#[derive(Default, Deserialize)]
struct RawData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    components: Vec<RawRow>,
}

#[derive(Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Deserialize)]
struct RawRow {
    #[serde(default)]
    components: Vec<RawInput>,
}

#[derive(Deserialize)]
struct RawInput {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct RawMessage {
    id: Snowflake,
}

#[derive(Deserialize)]
struct RawRole {
    id: Snowflake,
    name: String,
    position: i64,
    #[serde(default)]
    managed: bool,
    #[serde(default)]
    color: u32,
    #[serde(default)]
    permissions: Option<String>,
}

#[derive(Deserialize)]
struct RawGuild {
    id: Snowflake,
    owner_id: Snowflake,
    #[serde(default)]
    roles: Vec<RawRole>,
}

fn permissions(raw: Option<&str>) -> Permissions {
    Permissions(raw.and_then(|bits| bits.parse().ok()).unwrap_or_default())
}

impl RawUser {
    fn into_member(self, nickname: Option<String>, role_ids: Vec<RoleId>) -> Result<Member, WireError> {
        Ok(Member {
            id: UserId(self.id.value()?),
            username: self.username,
            global_name: self.global_name,
            nickname,
            role_ids,
            bot: self.bot,
        })
    }
}

impl RawMember {
    fn into_member(self) -> Result<(Member, Permissions), WireError> {
        let role_ids =
            self.roles.iter().map(|role| role.value().map(RoleId)).collect::<Result<Vec<_>, _>>()?;
        let granted = permissions(self.permissions.as_deref());
        Ok((self.user.into_member(self.nick, role_ids)?, granted))
    }
}

impl RawRole {
    fn into_role(self) -> Result<GuildRole, WireError> {
        Ok(GuildRole {
            id: RoleId(self.id.value()?),
            name: self.name,
            position: self.position,
            managed: self.managed,
            color: self.color,
            permissions: permissions(self.permissions.as_deref()),
        })
    }
}

pub fn decode_interaction(raw: &Value) -> Result<Inbound, WireError> {
    let raw = RawInteraction::deserialize(raw)?;
    if raw.kind == INTERACTION_PING {
        return Ok(Inbound::Ping);
    }

    let guild_id = raw.guild_id.as_ref().map(Snowflake::value).transpose()?.map(GuildId);
    let channel_id = raw
        .channel_id
        .as_ref()
        .ok_or_else(|| WireError::Invalid("interaction has no channel".to_owned()))?
        .value()
        .map(ChannelId)?;
    let actor = match (raw.member, raw.user) {
        (Some(member), _) => {
            let (member, permissions) = member.into_member()?;
            Actor { member, permissions }
        }
        (None, Some(user)) => {
            Actor { member: user.into_member(None, Vec::new())?, permissions: Permissions::default() }
        }
        (None, None) => return Err(WireError::Invalid("interaction has no user".to_owned())),
    };

    let data = raw.data.unwrap_or_default();
    let event = match raw.kind {
        INTERACTION_COMMAND => InteractionEvent::SlashCommand {
            name: data.name.unwrap_or_default(),
            options: decode_options(data.options)?,
        },
        INTERACTION_COMPONENT => {
            let message = raw
                .message
                .ok_or_else(|| WireError::Invalid("component interaction has no message".to_owned()))?;
            InteractionEvent::Component(ComponentAction {
                custom_id: data.custom_id.unwrap_or_default(),
                message_id: MessageId(message.id.value()?),
                values: data.values,
            })
        }
        INTERACTION_MODAL_SUBMIT => InteractionEvent::ModalSubmit {
            custom_id: data.custom_id.unwrap_or_default(),
            fields: data
                .components
                .into_iter()
                .flat_map(|row| row.components)
                .filter_map(|input| Some((input.custom_id?, input.value.unwrap_or_default())))
                .collect(),
        },
        other => InteractionEvent::Unsupported { kind: format!("interaction type {other}") },
    };

    Ok(Inbound::Interaction(InteractionEnvelope {
        interaction: InteractionRef { id: raw.id, token: raw.token },
        guild_id,
        channel_id,
        actor,
        event,
    }))
}

fn decode_options(options: Vec<RawOption>) -> Result<BTreeMap<String, OptionValue>, WireError> {
    let mut decoded = BTreeMap::new();
    for option in options {
        let Some(value) = option.value else { continue };
        let text = match &value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let parsed = match option.kind {
            OPTION_ROLE => OptionValue::Role(RoleId(Snowflake::Text(text).value()?)),
            OPTION_CHANNEL => OptionValue::Channel(ChannelId(Snowflake::Text(text).value()?)),
            OPTION_STRING => OptionValue::Text(text),
            _ => continue,
        };
        decoded.insert(option.name, parsed);
    }
    Ok(decoded)
}

pub fn decode_member(raw: Value) -> Result<Member, WireError> {
    RawMember::deserialize(raw)?.into_member().map(|(member, _)| member)
}

pub fn decode_members(raw: Value) -> Result<Vec<Member>, WireError> {
    Vec::<Value>::deserialize(raw)?.into_iter().map(decode_member).collect()
}

pub fn decode_guild(raw: Value) -> Result<GuildSnapshot, WireError> {
    let guild = RawGuild::deserialize(raw)?;
    Ok(GuildSnapshot {
        id: GuildId(guild.id.value()?),
        owner_id: UserId(guild.owner_id.value()?),
        roles: guild.roles.into_iter().map(RawRole::into_role).collect::<Result<_, _>>()?,
    })
}

pub fn decode_user(raw: Value) -> Result<BotIdentity, WireError> {
    let user = RawUser::deserialize(raw)?;
    Ok(BotIdentity { user_id: UserId(user.id.value()?), username: user.username })
}

pub fn decode_message_id(raw: Value) -> Result<MessageId, WireError> {
    Ok(MessageId(RawMessage::deserialize(raw)?.id.value()?))
}

pub fn decode_snowflake_field(raw: &Value, field: &str) -> Result<u64, WireError> {
    let value = raw
        .get(field)
        .ok_or_else(|| WireError::Invalid(format!("missing `{field}`")))?;
    Snowflake::deserialize(value)?.value()
}

/// Body for creating a message. Ephemeral replies carry the platform flag.
pub fn message_body(message: &MessageTemplate) -> Value {
    let mut body = edit_body(message);
    if message.ephemeral {
        body["flags"] = json!(EPHEMERAL_FLAG);
    }
    body
}

/// Body for replacing an existing message. Embeds and rows are always sent
/// so stale controls are cleared.
pub fn edit_body(message: &MessageTemplate) -> Value {
    let content = if message.embeds.is_empty() { message.content.as_str() } else { "" };
    json!({
        "content": content,
        "embeds": message.embeds.iter().map(embed_body).collect::<Vec<_>>(),
        "components": message.rows.iter().map(row_body).collect::<Vec<_>>(),
        "allowed_mentions": { "parse": [] },
    })
}

fn embed_body(embed: &Embed) -> Value {
    let mut body = json!({
        "title": embed.title,
        "description": embed.description,
        "color": embed.color.value(),
        "fields": embed
            .fields
            .iter()
            .map(|field| json!({ "name": field.name, "value": field.value, "inline": field.inline }))
            .collect::<Vec<_>>(),
    });
    if let Some(footer) = &embed.footer {
        body["footer"] = json!({ "text": footer });
    }
    body
}

fn row_body(row: &ActionRow) -> Value {
    json!({
        "type": 1,
        "components": row.components.iter().map(component_body).collect::<Vec<_>>(),
    })
}

fn component_body(component: &Component) -> Value {
    match component {
        Component::Button(button) => button_body(button),
        Component::Select(select) => select_body(select),
    }
}

fn button_body(button: &Button) -> Value {
    let style = match button.style {
        ButtonStyle::Primary => 1,
        ButtonStyle::Secondary => 2,
        ButtonStyle::Success => 3,
        ButtonStyle::Danger => 4,
    };
    let mut body = json!({
        "type": 2,
        "style": style,
        "label": button.label,
        "custom_id": button.custom_id,
        "disabled": button.disabled,
    });
    if let Some(emoji) = &button.emoji {
        body["emoji"] = json!({ "name": emoji });
    }
    body
}

fn select_body(select: &SelectMenu) -> Value {
    let options: Vec<Value> = select
        .options
        .iter()
        .map(|option| {
            let mut body = Map::new();
            body.insert("label".to_owned(), json!(option.label));
            body.insert("value".to_owned(), json!(option.value));
            if let Some(description) = &option.description {
                body.insert("description".to_owned(), json!(description));
            }
            if let Some(emoji) = &option.emoji {
                body.insert("emoji".to_owned(), json!({ "name": emoji }));
            }
            Value::Object(body)
        })
        .collect();
    json!({
        "type": 3,
        "custom_id": select.custom_id,
        "placeholder": select.placeholder,
        "options": options,
        "min_values": select.min_values,
        "max_values": select.max_values,
    })
}

fn modal_body(modal: &ModalTemplate) -> Value {
    let rows: Vec<Value> = modal
        .inputs
        .iter()
        .map(|input| {
            let mut body = json!({
                "type": 4,
                "custom_id": input.custom_id,
                "label": input.label,
                "style": match input.style {
                    InputStyle::Short => 1,
                    InputStyle::Paragraph => 2,
                },
                "required": input.required,
            });
            if let Some(placeholder) = &input.placeholder {
                body["placeholder"] = json!(placeholder);
            }
            if let Some(min) = input.min_length {
                body["min_length"] = json!(min);
            }
            if let Some(max) = input.max_length {
                body["max_length"] = json!(max);
            }
            json!({ "type": 1, "components": [body] })
        })
        .collect();
    json!({ "custom_id": modal.custom_id, "title": modal.title, "components": rows })
}

pub fn pong() -> Value {
    json!({ "type": 1 })
}

pub fn interaction_response(response: &InteractionResponse) -> Value {
    match response {
        InteractionResponse::Message(message) => json!({ "type": 4, "data": message_body(message) }),
        InteractionResponse::UpdateMessage(message) => json!({ "type": 7, "data": edit_body(message) }),
        InteractionResponse::Modal(modal) => json!({ "type": 9, "data": modal_body(modal) }),
        InteractionResponse::DeferredUpdate => json!({ "type": 6 }),
    }
}

pub fn command_body(command: &CommandSpec) -> Value {
    let options: Vec<Value> = command
        .options
        .iter()
        .map(|option| {
            json!({
                "type": match option.kind {
                    OptionKind::Role => OPTION_ROLE,
                    OptionKind::Channel => OPTION_CHANNEL,
                },
                "name": option.name,
                "description": option.description,
                "required": option.required,
            })
        })
        .collect();
    json!({
        "type": 1,
        "name": command.name,
        "description": command.description,
        "options": options,
        "dm_permission": false,
    })
}

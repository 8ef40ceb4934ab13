//! Slash command catalog and the custom ids carried by buttons, menus and modals.

use guildhall_core::domain::category::Category;
use guildhall_core::domain::ids::UserId;
use guildhall_core::domain::verification::Vocation;
use guildhall_core::roles::BulkAction;

pub const CREATE_EVENT: &str = "criar_evento_boss";
pub const EVENT_RESULTS: &str = "resultado_evento";
pub const DELETE_EVENTS: &str = "deletar_eventos";
pub const CLEAR_POLLS: &str = "limpar_evento";
pub const SYNC_COMMANDS: &str = "sync_comandos";
pub const MANAGE_ROLES: &str = "gerenciar_cargos";
pub const CREATE_VERIFICATION_PANEL: &str = "criar_painel_verificacao";
pub const CHECK_ROLES: &str = "verificar_cargos";
pub const VERIFICATION_RESULTS: &str = "resultado_verificacao";

pub const ROLE_OPTION: &str = "cargo";
pub const CHANNEL_OPTION: &str = "canal";

/// Which service owns an interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    Polls,
    Roles,
    Verification,
    Admin,
    Unsupported,
}

pub fn command_feature(name: &str) -> Feature {
    match name {
        CREATE_EVENT | EVENT_RESULTS | DELETE_EVENTS | CLEAR_POLLS => Feature::Polls,
        MANAGE_ROLES => Feature::Roles,
        CREATE_VERIFICATION_PANEL | CHECK_ROLES | VERIFICATION_RESULTS => Feature::Verification,
        SYNC_COMMANDS => Feature::Admin,
        _ => Feature::Unsupported,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    Role,
    Channel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<OptionSpec>,
}

impl CommandSpec {
    fn plain(name: &'static str, description: &'static str) -> Self {
        Self { name, description, options: Vec::new() }
    }

    fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }
}

pub fn catalog() -> Vec<CommandSpec> {
    vec![
        CommandSpec::plain(CREATE_EVENT, "Create a new event sign-up poll"),
        CommandSpec::plain(EVENT_RESULTS, "Show the results of the latest events"),
        CommandSpec::plain(DELETE_EVENTS, "Delete saved events from storage"),
        CommandSpec::plain(CLEAR_POLLS, "Close the polls currently held in memory"),
        CommandSpec::plain(SYNC_COMMANDS, "[ADMIN] Re-register the slash commands"),
        CommandSpec::plain(MANAGE_ROLES, "Add or remove a role for many members at once").with_option(
            OptionSpec {
                name: ROLE_OPTION,
                description: "Role to manage (optional)",
                kind: OptionKind::Role,
                required: false,
            },
        ),
        CommandSpec::plain(CREATE_VERIFICATION_PANEL, "[ADMIN] Post the member verification panel")
            .with_option(OptionSpec {
                name: CHANNEL_OPTION,
                description: "Channel for the panel (defaults to this one)",
                kind: OptionKind::Channel,
                required: false,
            }),
        CommandSpec::plain(CHECK_ROLES, "[ADMIN] Check that the verification roles exist"),
        CommandSpec::plain(VERIFICATION_RESULTS, "[ADMIN] List recorded member verifications"),
    ]
}

/// Controls on a bulk role session card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleControl {
    Show(BulkAction),
    Batch(BulkAction, usize),
    SelectAll(BulkAction),
    Clear(BulkAction),
    Page(BulkAction, bool),
    Confirm(BulkAction),
    Apply(BulkAction),
    Back,
    ChangeRole,
    Cancel,
}

/// Decoded `custom_id` of a component or modal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentRoute {
    CreatePoll,
    Vote(Category),
    EventDetails { invoker: UserId },
    DeleteSelect { invoker: UserId },
    DeleteConfirm { invoker: UserId },
    DeleteCancel { invoker: UserId },
    RolePick,
    Role(RoleControl),
    VerifyStart,
    VerifyNickname,
    VerifyVocation(Vocation),
}

impl ComponentRoute {
    pub fn feature(self) -> Feature {
        match self {
            Self::CreatePoll
            | Self::Vote(_)
            | Self::EventDetails { .. }
            | Self::DeleteSelect { .. }
            | Self::DeleteConfirm { .. }
            | Self::DeleteCancel { .. } => Feature::Polls,
            Self::RolePick | Self::Role(_) => Feature::Roles,
            Self::VerifyStart | Self::VerifyNickname | Self::VerifyVocation(_) => Feature::Verification,
        }
    }

    pub fn custom_id(self) -> String {
        match self {
            Self::CreatePoll => "poll:create".to_owned(),
            Self::Vote(category) => format!("poll:vote:{}", category.key()),
            Self::EventDetails { invoker } => format!("events:details:{invoker}"),
            Self::DeleteSelect { invoker } => format!("events:delete:{invoker}"),
            Self::DeleteConfirm { invoker } => format!("events:delete_confirm:{invoker}"),
            Self::DeleteCancel { invoker } => format!("events:delete_cancel:{invoker}"),
            Self::RolePick => "roles:pick".to_owned(),
            Self::Role(control) => match control {
                RoleControl::Show(action) => format!("roles:show:{}", action.key()),
                RoleControl::Batch(action, index) => format!("roles:batch:{}:{index}", action.key()),
                RoleControl::SelectAll(action) => format!("roles:all:{}", action.key()),
                RoleControl::Clear(action) => format!("roles:clear:{}", action.key()),
                RoleControl::Page(action, forward) => {
                    format!("roles:page:{}:{}", action.key(), if forward { "next" } else { "prev" })
                }
                RoleControl::Confirm(action) => format!("roles:confirm:{}", action.key()),
                RoleControl::Apply(action) => format!("roles:apply:{}", action.key()),
                RoleControl::Back => "roles:back".to_owned(),
                RoleControl::ChangeRole => "roles:change".to_owned(),
                RoleControl::Cancel => "roles:cancel".to_owned(),
            },
            Self::VerifyStart => "verify:start".to_owned(),
            Self::VerifyNickname => "verify:nickname".to_owned(),
            Self::VerifyVocation(vocation) => format!("verify:vocation:{}", vocation.code()),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let parts: Vec<&str> = custom_id.split(':').collect();
        let route = match parts.as_slice() {
            ["poll", "create"] => Self::CreatePoll,
            ["poll", "vote", key] => Self::Vote(Category::from_key(key)?),
            ["events", verb, invoker] => {
                let invoker = invoker.parse().ok()?;
                match *verb {
                    "details" => Self::EventDetails { invoker },
                    "delete" => Self::DeleteSelect { invoker },
                    "delete_confirm" => Self::DeleteConfirm { invoker },
                    "delete_cancel" => Self::DeleteCancel { invoker },
                    _ => return None,
                }
            }
            ["roles", "pick"] => Self::RolePick,
            ["roles", "back"] => Self::Role(RoleControl::Back),
            ["roles", "change"] => Self::Role(RoleControl::ChangeRole),
            ["roles", "cancel"] => Self::Role(RoleControl::Cancel),
            ["roles", "batch", action, index] => {
                Self::Role(RoleControl::Batch(BulkAction::from_key(action)?, index.parse().ok()?))
            }
            ["roles", "page", action, direction] => {
                let forward = match *direction {
                    "next" => true,
                    "prev" => false,
                    _ => return None,
                };
                Self::Role(RoleControl::Page(BulkAction::from_key(action)?, forward))
            }
            ["roles", verb, action] => {
                let action = BulkAction::from_key(action)?;
                Self::Role(match *verb {
                    "show" => RoleControl::Show(action),
                    "all" => RoleControl::SelectAll(action),
                    "clear" => RoleControl::Clear(action),
                    "confirm" => RoleControl::Confirm(action),
                    "apply" => RoleControl::Apply(action),
                    _ => return None,
                })
            }
            ["verify", "start"] => Self::VerifyStart,
            ["verify", "nickname"] => Self::VerifyNickname,
            ["verify", "vocation", code] => Self::VerifyVocation(Vocation::from_code(code)?),
            _ => return None,
        };
        Some(route)
    }
}

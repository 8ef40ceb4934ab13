//! Bulk role management: pick a role, select members in batches, confirm, apply.
//!
//! Each moderator has at most one session, held in memory for the configured
//! TTL. Applying a session consumes it.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use guildhall_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use guildhall_core::domain::ids::{GuildId, RoleId, UserId};
use guildhall_core::domain::member::{GuildRole, Member, Permissions};
use guildhall_core::errors::DomainError;
use guildhall_core::roles::{
    ensure_can_manage, manageable_roles, BulkAction, BulkReport, Hierarchy, MemberOutcome, RoleRoster,
    RoleSession, SessionView,
};

use crate::blocks::{
    notice, Button, ButtonStyle, Color, MessageBuilder, MessageTemplate, SelectMenu, SelectOption,
};
use crate::commands::{ComponentRoute, Feature, RoleControl, MANAGE_ROLES, ROLE_OPTION};
use crate::effects::Effect;
use crate::events::{
    ComponentAction, EventContext, HandlerError, HandlerResult, InteractionEnvelope, InteractionEvent,
    InteractionHandler,
};
use crate::platform::{GuildSnapshot, InteractionResponse};

use super::{role_option, ServiceDeps};

/// Names listed per side of the overview card before summarizing the rest.
const OVERVIEW_NAMES: usize = 20;
const REPORT_NAMES: usize = 25;

struct ActiveSession {
    guild_id: GuildId,
    session: RoleSession,
    touched: Instant,
}

pub struct RoleService {
    deps: ServiceDeps,
    sessions: Mutex<HashMap<UserId, ActiveSession>>,
}

impl RoleService {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps, sessions: Mutex::new(HashMap::new()) }
    }

    /// Both the moderator and the bot need Manage Roles.
    async fn ensure_manage_roles(
        &self,
        envelope: &InteractionEnvelope,
    ) -> Result<(GuildSnapshot, Member), HandlerError> {
        if !envelope.actor.permissions.contains(Permissions::MANAGE_ROLES) {
            return Err(DomainError::PermissionDenied(
                "You need the Manage Roles permission to use this command.".to_owned(),
            )
            .into());
        }
        let guild_id = envelope.guild()?;
        let guild = self.deps.platform.guild(guild_id).await?;
        let bot = self.deps.platform.bot_member(guild_id).await?;
        if !bot.permissions(guild_id, &guild.roles).contains(Permissions::MANAGE_ROLES) {
            return Err(DomainError::PermissionDenied(
                "I need the Manage Roles permission to change member roles.".to_owned(),
            )
            .into());
        }
        Ok((guild, bot))
    }

    async fn command(
        &self,
        envelope: &InteractionEnvelope,
        role_id: Option<RoleId>,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let (guild, bot) = self.ensure_manage_roles(envelope).await?;
        let message = match role_id {
            Some(role_id) => self.open_session(envelope, &guild, &bot, role_id, ctx).await?,
            None => role_picker(&guild)?,
        };
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn open_session(
        &self,
        envelope: &InteractionEnvelope,
        guild: &GuildSnapshot,
        bot: &Member,
        role_id: RoleId,
        ctx: &EventContext,
    ) -> Result<MessageTemplate, HandlerError> {
        let role = guild
            .role(role_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound { entity: "role", id: role_id.to_string() })?;
        if role.is_default_for(guild.id) || role.managed {
            return Err(DomainError::InvalidInput(format!(
                "{} is managed automatically and cannot be edited in bulk.",
                role.mention()
            ))
            .into());
        }

        let actor = &envelope.actor.member;
        ensure_can_manage(
            &role,
            Hierarchy {
                actor_top_position: actor.top_role_position(&guild.roles),
                actor_is_owner: guild.owner_id == actor.id,
                bot_top_position: bot.top_role_position(&guild.roles),
            },
        )?;

        let members = self.deps.platform.list_members(guild.id).await?;
        let roster = RoleRoster::split(role, members);
        info!(
            event_name = "roles.session_opened",
            correlation_id = %ctx.correlation_id,
            role_id = %role_id,
            moderator = %actor.id,
            with_role = roster.with_role().len(),
            without_role = roster.without_role().len(),
            "bulk role session opened"
        );

        let session = RoleSession::new(roster);
        let message = render_session(&session);
        let mut sessions = self.sessions.lock().await;
        let ttl = self.deps.settings.role_session_ttl;
        sessions.retain(|_, active| active.touched.elapsed() < ttl);
        sessions.insert(actor.id, ActiveSession { guild_id: guild.id, session, touched: Instant::now() });
        Ok(message)
    }

    async fn pick(
        &self,
        envelope: &InteractionEnvelope,
        action: &ComponentAction,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let role_id = action
            .values
            .first()
            .and_then(|value| value.parse::<RoleId>().ok())
            .ok_or_else(|| HandlerError::Malformed("role picker sent no role".to_owned()))?;
        let (guild, bot) = self.ensure_manage_roles(envelope).await?;
        let message = self.open_session(envelope, &guild, &bot, role_id, ctx).await?;
        Ok(HandlerResult::effect(Effect::UpdateSource(message)))
    }

    async fn control(
        &self,
        envelope: &InteractionEnvelope,
        action: &ComponentAction,
        control: RoleControl,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let moderator = envelope.actor.member.id;
        let mut sessions = self.sessions.lock().await;
        let ttl = self.deps.settings.role_session_ttl;
        sessions.retain(|_, active| active.touched.elapsed() < ttl);

        match control {
            RoleControl::Cancel => {
                sessions.remove(&moderator);
                return Ok(update(notice("❌ Role management cancelled.")));
            }
            RoleControl::ChangeRole => {
                sessions.remove(&moderator);
                drop(sessions);
                let (guild, _) = self.ensure_manage_roles(envelope).await?;
                return Ok(update(role_picker(&guild)?));
            }
            RoleControl::Apply(bulk) => {
                let Some(active) = sessions.remove(&moderator) else {
                    return Ok(update(expired()));
                };
                drop(sessions);
                return self.apply(envelope, active, bulk, ctx).await;
            }
            _ => {}
        }

        let Some(active) = sessions.get_mut(&moderator) else {
            return Ok(update(expired()));
        };
        active.touched = Instant::now();
        let session = &mut active.session;
        match control {
            RoleControl::Show(bulk) => {
                session.view = SessionView::Selecting(bulk);
                session.page = 0;
            }
            RoleControl::Batch(bulk, _) => {
                let ids = action.values.iter().filter_map(|value| value.parse::<UserId>().ok());
                session.selection.toggle(bulk, ids);
                session.view = SessionView::Selecting(bulk);
            }
            RoleControl::SelectAll(bulk) => {
                session.selection.select_all(bulk, &session.roster);
                session.view = SessionView::Selecting(bulk);
            }
            RoleControl::Clear(bulk) => {
                session.selection.clear(bulk);
                session.view = SessionView::Selecting(bulk);
            }
            RoleControl::Page(bulk, forward) => {
                session.turn_page(bulk, forward);
                session.view = SessionView::Selecting(bulk);
            }
            RoleControl::Confirm(bulk) => {
                if session.selection.selected(bulk).is_empty() {
                    return Ok(HandlerResult::effect(Effect::Reply(notice(
                        "❌ Select at least one member first.",
                    ))));
                }
                session.view = SessionView::Confirming(bulk);
            }
            RoleControl::Back => {
                session.view = SessionView::Overview;
                session.page = 0;
            }
            RoleControl::Apply(_) | RoleControl::ChangeRole | RoleControl::Cancel => {}
        }
        Ok(update(render_session(session)))
    }

    async fn apply(
        &self,
        envelope: &InteractionEnvelope,
        active: ActiveSession,
        bulk: BulkAction,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        // Editing many members can outlast the interaction deadline.
        self.deps.platform.respond(&envelope.interaction, InteractionResponse::DeferredUpdate).await?;

        let moderator = &envelope.actor.member;
        let session = active.session;
        let role = session.roster.role().clone();
        let reason = format!("Bulk role management by {}", moderator.username);
        let mut report = BulkReport::new(bulk);

        for member_id in session.selection.selected(bulk) {
            let known_name = session.roster.find(*member_id).map(|member| member.display_name().to_owned());
            let current = match self.deps.platform.member(active.guild_id, *member_id).await {
                Ok(current) => current,
                Err(error) => {
                    warn!(
                        event_name = "roles.member_lookup_failed",
                        correlation_id = %ctx.correlation_id,
                        user_id = %member_id,
                        error = %error,
                        "could not fetch member"
                    );
                    let name = known_name.unwrap_or_else(|| member_id.to_string());
                    report.record(*member_id, name, error.member_outcome());
                    continue;
                }
            };
            let Some(current) = current else {
                report.record(*member_id, known_name.unwrap_or_else(|| member_id.to_string()), MemberOutcome::NotFound);
                continue;
            };
            let name = current.display_name().to_owned();

            let outcome = match bulk {
                BulkAction::Add if current.has_role(role.id) => MemberOutcome::AlreadyHasRole,
                BulkAction::Remove if !current.has_role(role.id) => MemberOutcome::LacksRole,
                BulkAction::Add => self.edit(active.guild_id, *member_id, role.id, &reason, true).await,
                BulkAction::Remove => self.edit(active.guild_id, *member_id, role.id, &reason, false).await,
            };
            report.record(*member_id, name, outcome);
        }

        info!(
            event_name = "roles.bulk_applied",
            correlation_id = %ctx.correlation_id,
            role_id = %role.id,
            action = bulk.key(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "bulk role edit finished"
        );
        self.deps.audit(
            AuditEvent::new(
                &ctx.correlation_id,
                "roles.bulk_applied",
                AuditCategory::Roles,
                Some(moderator.id),
                if report.failure_count() == 0 { AuditOutcome::Success } else { AuditOutcome::Failed },
            )
            .with_metadata("role_id", role.id)
            .with_metadata("action", bulk.key())
            .with_metadata("succeeded", report.success_count())
            .with_metadata("failed", report.failure_count()),
        );

        Ok(HandlerResult::effect(Effect::EditOriginal(render_report(&role, &report))))
    }

    async fn edit(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId, reason: &str, add: bool) -> MemberOutcome {
        let result = if add {
            self.deps.platform.add_role(guild_id, user_id, role_id, reason).await
        } else {
            self.deps.platform.remove_role(guild_id, user_id, role_id, reason).await
        };
        match result {
            Ok(()) => MemberOutcome::Applied,
            Err(error) => {
                warn!(
                    event_name = "roles.member_edit_failed",
                    user_id = %user_id,
                    role_id = %role_id,
                    error = %error,
                    "role edit failed"
                );
                error.member_outcome()
            }
        }
    }
}

#[async_trait]
impl InteractionHandler for RoleService {
    fn feature(&self) -> Feature {
        Feature::Roles
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        match &envelope.event {
            InteractionEvent::SlashCommand { name, options } if name == MANAGE_ROLES => {
                self.command(envelope, role_option(options, ROLE_OPTION), ctx).await
            }
            InteractionEvent::Component(action) => match ComponentRoute::parse(&action.custom_id) {
                Some(ComponentRoute::RolePick) => self.pick(envelope, action, ctx).await,
                Some(ComponentRoute::Role(control)) => self.control(envelope, action, control, ctx).await,
                _ => Ok(HandlerResult::Ignored),
            },
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

fn update(message: MessageTemplate) -> HandlerResult {
    HandlerResult::effect(Effect::UpdateSource(message))
}

fn expired() -> MessageTemplate {
    notice(format!("⌛ This session expired. Run /{MANAGE_ROLES} again."))
}

fn role_picker(guild: &GuildSnapshot) -> Result<MessageTemplate, HandlerError> {
    let roles: Vec<GuildRole> = manageable_roles(&guild.roles, guild.id);
    if roles.is_empty() {
        return Err(DomainError::InvalidInput("This server has no roles that can be managed.".to_owned()).into());
    }
    let options = roles
        .iter()
        .map(|role| {
            SelectOption::new(&role.name, role.id.to_string()).description(format!("Position {}", role.position))
        })
        .collect();
    Ok(MessageBuilder::new("")
        .embed("🎭 Bulk role management", Color::Blue, |embed| {
            embed.line("Pick the role you want to add to or remove from members.");
        })
        .row(|row| {
            row.select(SelectMenu::new(ComponentRoute::RolePick.custom_id(), "Pick a role...", options));
        })
        .row(|row| {
            row.button(Button::new(ComponentRoute::Role(RoleControl::Cancel).custom_id(), "Cancel"));
        })
        .ephemeral()
        .build())
}

fn name_list(members: &[Member], limit: usize) -> String {
    if members.is_empty() {
        return "*nobody*".to_owned();
    }
    let mut lines: Vec<String> =
        members.iter().take(limit).map(|member| format!("• {}", member.display_name())).collect();
    if members.len() > limit {
        lines.push(format!("...and {} more", members.len() - limit));
    }
    lines.join("\n")
}

fn action_verb(bulk: BulkAction) -> &'static str {
    match bulk {
        BulkAction::Add => "Add",
        BulkAction::Remove => "Remove",
    }
}

fn render_session(session: &RoleSession) -> MessageTemplate {
    let role = session.roster.role();
    let cancel = Button::new(ComponentRoute::Role(RoleControl::Cancel).custom_id(), "Cancel");
    match session.view {
        SessionView::Overview => {
            let roster = &session.roster;
            MessageBuilder::new("")
                .embed(format!("🎭 Managing role: {}", role.name), Color::Blue, |embed| {
                    embed
                        .line(format!("{} · {} member(s) in the server", role.mention(), roster.total()))
                        .field(
                            format!("✅ With the role ({})", roster.with_role().len()),
                            name_list(roster.with_role(), OVERVIEW_NAMES),
                            true,
                        )
                        .field(
                            format!("➖ Without the role ({})", roster.without_role().len()),
                            name_list(roster.without_role(), OVERVIEW_NAMES),
                            true,
                        );
                })
                .row(|row| {
                    row.button(
                        Button::new(ComponentRoute::Role(RoleControl::Show(BulkAction::Add)).custom_id(), "Add role")
                            .emoji("➕")
                            .style(ButtonStyle::Success)
                            .disabled(roster.without_role().is_empty()),
                    )
                    .button(
                        Button::new(
                            ComponentRoute::Role(RoleControl::Show(BulkAction::Remove)).custom_id(),
                            "Remove role",
                        )
                        .emoji("➖")
                        .style(ButtonStyle::Danger)
                        .disabled(roster.with_role().is_empty()),
                    )
                    .button(Button::new(ComponentRoute::Role(RoleControl::ChangeRole).custom_id(), "Change role"))
                    .button(cancel);
                })
                .ephemeral()
                .build()
        }
        SessionView::Selecting(bulk) => {
            let selected = session.selection.selected(bulk);
            let pages = session.page_count(bulk);
            let mut builder = MessageBuilder::new("").embed(
                format!("{} role {}", action_verb(bulk), role.name),
                Color::Blue,
                |embed| {
                    embed
                        .line(format!("**{} member(s) selected.**", selected.len()))
                        .line("Picking a selected member again unselects them.");
                    if pages > 1 {
                        embed.footer(format!("Page {}/{pages}", session.page + 1));
                    }
                },
            );
            for (index, batch) in session.visible_batches(bulk) {
                let options = batch
                    .iter()
                    .map(|member| {
                        let option = SelectOption::new(member.display_name(), member.id.to_string())
                            .description(format!("@{}", member.username));
                        if selected.contains(&member.id) {
                            option.emoji("✅")
                        } else {
                            option
                        }
                    })
                    .collect();
                let first = index * guildhall_core::roles::SELECT_BATCH_SIZE + 1;
                let last = first + batch.len() - 1;
                builder = builder.row(|row| {
                    row.select(SelectMenu::multi(
                        ComponentRoute::Role(RoleControl::Batch(bulk, index)).custom_id(),
                        format!("Members {first}-{last}"),
                        options,
                    ));
                });
            }
            builder
                .row(|row| {
                    if pages > 1 {
                        row.button(
                            Button::new(ComponentRoute::Role(RoleControl::Page(bulk, true)).custom_id(), "Next page")
                                .emoji("▶️"),
                        );
                    }
                    row.button(
                        Button::new(ComponentRoute::Role(RoleControl::SelectAll(bulk)).custom_id(), "Select all")
                            .style(ButtonStyle::Primary),
                    )
                    .button(Button::new(ComponentRoute::Role(RoleControl::Clear(bulk)).custom_id(), "Clear"))
                    .button(
                        Button::new(ComponentRoute::Role(RoleControl::Confirm(bulk)).custom_id(), "Review")
                            .style(ButtonStyle::Success)
                            .disabled(selected.is_empty()),
                    )
                    .button(Button::new(ComponentRoute::Role(RoleControl::Back).custom_id(), "Back"));
                })
                .ephemeral()
                .build()
        }
        SessionView::Confirming(bulk) => {
            let members: Vec<Member> = session
                .selection
                .selected(bulk)
                .iter()
                .filter_map(|id| session.roster.find(*id).cloned())
                .collect();
            let count = session.selection.selected(bulk).len();
            MessageBuilder::new("")
                .embed("⚠️ Confirm bulk edit", Color::Orange, |embed| {
                    embed
                        .line(format!("**{} {} for {count} member(s).**", action_verb(bulk), role.mention()))
                        .field("Members", name_list(&members, 30), false);
                })
                .row(|row| {
                    row.button(
                        Button::new(
                            ComponentRoute::Role(RoleControl::Apply(bulk)).custom_id(),
                            format!("Apply to {count} member(s)"),
                        )
                        .style(match bulk {
                            BulkAction::Add => ButtonStyle::Success,
                            BulkAction::Remove => ButtonStyle::Danger,
                        }),
                    )
                    .button(Button::new(ComponentRoute::Role(RoleControl::Show(bulk)).custom_id(), "Back to selection"))
                    .button(cancel);
                })
                .ephemeral()
                .build()
        }
    }
}

fn render_report(role: &GuildRole, report: &BulkReport) -> MessageTemplate {
    let failed = report.failure_count();
    let warnings = report.problems().count() - failed;
    let (title, color) = if failed == 0 {
        ("✅ Bulk edit finished", Color::Green)
    } else {
        ("⚠️ Bulk edit finished with errors", Color::Orange)
    };
    let successes: Vec<String> = report.successes().take(REPORT_NAMES).map(|entry| format!("• {}", entry.name)).collect();
    let problems: Vec<String> = report
        .problems()
        .take(REPORT_NAMES)
        .map(|entry| format!("• {}: {}", entry.name, entry.outcome.describe()))
        .collect();

    MessageBuilder::new("")
        .embed(title, color, |embed| {
            embed
                .line(format!("**Role:** {}", role.mention()))
                .line(format!("**Action:** {}", action_verb(report.action)))
                .line(format!("**Succeeded:** {}", report.success_count()))
                .line(format!("**Warnings:** {warnings}"))
                .line(format!("**Failed:** {failed}"));
            if !successes.is_empty() {
                embed.field("Succeeded", successes.join("\n"), false);
            }
            if !problems.is_empty() {
                embed.field("Needs attention", problems.join("\n"), false);
            }
        })
        .ephemeral()
        .build()
}

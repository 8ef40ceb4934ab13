//! Member onboarding: panel, nickname modal, vocation pick, role grant.

use async_trait::async_trait;
use tracing::{info, warn};

use guildhall_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use guildhall_core::domain::member::Member;
use guildhall_core::domain::verification::{
    validate_nickname, VerificationRecord, VerificationStats, VerificationStatus, Vocation,
    NICKNAME_MAX_CHARS, NICKNAME_MIN_CHARS,
};

use crate::blocks::{notice, Button, ButtonStyle, Color, MessageBuilder, ModalTemplate, TextInput};
use crate::commands::{
    ComponentRoute, Feature, CHANNEL_OPTION, CHECK_ROLES, CREATE_VERIFICATION_PANEL, VERIFICATION_RESULTS,
};
use crate::effects::Effect;
use crate::events::{
    EventContext, HandlerError, HandlerResult, InteractionEnvelope, InteractionEvent, InteractionHandler,
};

use super::{channel_option, ServiceDeps};

pub const NICKNAME_FIELD: &str = "nickname";
/// Character budget for the record listing of the results command.
pub const RESULTS_LISTING_MAX: usize = 3500;

const REASON: &str = "Member verification";

pub struct VerificationService {
    deps: ServiceDeps,
}

impl VerificationService {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps }
    }

    async fn post_panel(
        &self,
        envelope: &InteractionEnvelope,
        channel: Option<guildhall_core::domain::ids::ChannelId>,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_admin(envelope)?;
        let channel_id = channel.unwrap_or(envelope.channel_id);
        let panel = MessageBuilder::new("")
            .embed("🛡️ Member verification", Color::Blue, |embed| {
                embed
                    .line("Welcome! To get access to the server:")
                    .blank()
                    .line("**1.** Click **Start verification**")
                    .line("**2.** Set your in-game nickname")
                    .line("**3.** Pick your vocation")
                    .blank();
                for vocation in Vocation::ALL {
                    embed.line(format!(
                        "{} **{}** ({}): {}",
                        vocation.emoji(),
                        vocation.name(),
                        vocation.code(),
                        vocation.role_summary()
                    ));
                }
            })
            .row(|row| {
                row.button(
                    Button::new(ComponentRoute::VerifyStart.custom_id(), "Start verification")
                        .emoji("✅")
                        .style(ButtonStyle::Success),
                );
            })
            .build();
        let message_id = self.deps.platform.send_message(channel_id, &panel).await?;
        info!(
            event_name = "verification.panel_posted",
            correlation_id = %ctx.correlation_id,
            channel_id = %channel_id,
            message_id = %message_id,
            "verification panel posted"
        );
        Ok(HandlerResult::effect(Effect::Reply(notice(format!(
            "✅ Verification panel posted in <#{channel_id}>."
        )))))
    }

    async fn check_roles(&self, envelope: &InteractionEnvelope) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_admin(envelope)?;
        let guild = self.deps.platform.guild(envelope.guild()?).await?;
        let required: Vec<&str> = std::iter::once(self.deps.settings.guest_role.as_str())
            .chain(Vocation::ALL.iter().map(|vocation| vocation.code()))
            .collect();
        let missing = required.iter().filter(|name| guild.role_named(name).is_none()).count();

        let message = MessageBuilder::new("")
            .embed(
                "🔍 Verification roles",
                if missing == 0 { Color::Green } else { Color::Orange },
                |embed| {
                    for name in &required {
                        match guild.role_named(name) {
                            Some(role) => embed.line(format!("✅ **{name}** {}", role.mention())),
                            None => embed.line(format!("❌ **{name}** (missing)")),
                        };
                    }
                    if missing > 0 {
                        embed.footer(format!("{missing} role(s) missing. Create them with these exact names."));
                    } else {
                        embed.footer("Every verification role is in place.");
                    }
                },
            )
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn results(&self, envelope: &InteractionEnvelope) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_admin(envelope)?;
        let records = self.deps.verifications.recent(usize::MAX).await?;
        if records.is_empty() {
            return Ok(HandlerResult::effect(Effect::Reply(notice("📭 No verifications recorded yet."))));
        }

        let mut listing = String::new();
        let mut shown = 0;
        for (index, record) in records.iter().enumerate() {
            let vocation = record
                .vocation
                .map_or_else(|| "no vocation".to_owned(), |vocation| format!("{} {}", vocation.emoji(), vocation.code()));
            let line = format!(
                "**{}.** {} ({vocation}) · {} · {}\n",
                index + 1,
                record.display_name(),
                record.status.label(),
                record.recorded_at_display.as_deref().unwrap_or("-")
            );
            if listing.chars().count() + line.chars().count() > RESULTS_LISTING_MAX {
                break;
            }
            listing.push_str(&line);
            shown += 1;
        }
        if shown < records.len() {
            listing.push_str(&format!("...and {} more record(s)", records.len() - shown));
        }

        let stats = VerificationStats::collect(&records);
        let by_vocation: Vec<String> = stats
            .by_vocation
            .iter()
            .map(|(vocation, count)| match vocation {
                Some(vocation) => format!("{} {}: {count}", vocation.emoji(), vocation.name()),
                None => format!("❔ No vocation: {count}"),
            })
            .collect();
        let by_status: Vec<String> =
            stats.by_status.iter().map(|(status, count)| format!("{}: {count}", status.label())).collect();

        let message = MessageBuilder::new("")
            .embed("📋 Verification results", Color::Blue, |embed| {
                embed
                    .line(listing)
                    .field("By vocation", by_vocation.join("\n"), true)
                    .field("By status", by_status.join("\n"), true)
                    .footer(format!("Total: {} record(s)", records.len()));
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn start(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let member = &envelope.actor.member;
        let guild = self.deps.platform.guild(envelope.guild()?).await?;
        let verified = guild
            .role_named(&self.deps.settings.guest_role)
            .is_some_and(|role| member.has_role(role.id));
        if verified {
            return Ok(HandlerResult::effect(Effect::Reply(notice("✅ You are already verified!"))));
        }

        let mut record = VerificationRecord::started(member.id, &member.username, member.global_name.clone());
        record.server_nickname = member.nickname.clone();
        self.deps.verifications.save(&record).await?;
        self.audit(ctx, member, "verification.started", VerificationStatus::Started);

        let message = MessageBuilder::new("")
            .embed("📝 Step 1: your nickname", Color::Blue, |embed| {
                embed
                    .line("Set the nickname you use in the game.")
                    .line(format!(
                        "It must have {NICKNAME_MIN_CHARS} to {NICKNAME_MAX_CHARS} characters and cannot contain @, #, : or ```."
                    ));
            })
            .row(|row| {
                row.button(
                    Button::new(ComponentRoute::VerifyNickname.custom_id(), "Set nickname")
                        .emoji("📝")
                        .style(ButtonStyle::Primary),
                );
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn set_nickname(
        &self,
        envelope: &InteractionEnvelope,
        raw: &str,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let nickname = validate_nickname(raw)?;
        let member = &envelope.actor.member;
        self.deps.platform.set_nickname(envelope.guild()?, member.id, &nickname, REASON).await?;

        let mut record = self.record_for(member).await?;
        record.server_nickname = Some(nickname.clone());
        record.status = VerificationStatus::NicknameSet;
        self.deps.verifications.save(&record).await?;
        self.audit(ctx, member, "verification.nickname_set", VerificationStatus::NicknameSet);

        let buttons = Vocation::ALL.into_iter().map(|vocation| {
            Button::new(ComponentRoute::VerifyVocation(vocation).custom_id(), vocation.name())
                .emoji(vocation.emoji())
                .style(ButtonStyle::Primary)
        });
        let message = MessageBuilder::new("")
            .embed("⚔️ Step 2: your vocation", Color::Blue, |embed| {
                embed
                    .line(format!("✅ Nickname set to **{nickname}**."))
                    .blank()
                    .line("Now pick your vocation:");
            })
            .button_rows(buttons)
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn pick_vocation(
        &self,
        envelope: &InteractionEnvelope,
        vocation: Vocation,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let member = &envelope.actor.member;
        let guild_id = envelope.guild()?;
        let guild = self.deps.platform.guild(guild_id).await?;
        let Some(guest) = guild.role_named(&self.deps.settings.guest_role) else {
            warn!(
                event_name = "verification.guest_role_missing",
                correlation_id = %ctx.correlation_id,
                role = %self.deps.settings.guest_role,
                "verification cannot finish without the guest role"
            );
            return Ok(HandlerResult::effect(Effect::Reply(notice(format!(
                "❌ The **{}** role does not exist. Ask an administrator to run /{CHECK_ROLES}.",
                self.deps.settings.guest_role
            )))));
        };

        if !member.has_role(guest.id) {
            self.deps.platform.add_role(guild_id, member.id, guest.id, REASON).await?;
        }
        let vocation_role = guild.role_named(vocation.code());
        match vocation_role {
            Some(role) if !member.has_role(role.id) => {
                self.deps.platform.add_role(guild_id, member.id, role.id, REASON).await?;
            }
            Some(_) => {}
            None => warn!(
                event_name = "verification.vocation_role_missing",
                correlation_id = %ctx.correlation_id,
                vocation = vocation.code(),
                "vocation role missing; only the guest role was granted"
            ),
        }

        let mut record = self.record_for(member).await?;
        record.vocation = Some(vocation);
        record.status = VerificationStatus::Completed;
        let record = self.deps.verifications.save(&record).await?;
        self.audit(ctx, member, "verification.completed", VerificationStatus::Completed);

        let message = MessageBuilder::new("")
            .embed("🎉 Verification complete!", Color::Green, |embed| {
                embed
                    .line(format!("**Nickname:** {}", record.display_name()))
                    .line(format!("**Vocation:** {} {}", vocation.emoji(), vocation.name()))
                    .blank()
                    .line("Welcome to the guild!");
                if vocation_role.is_none() {
                    embed.footer(format!("The {} role is missing; an administrator will add it later.", vocation.code()));
                }
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::UpdateSource(message)))
    }

    async fn record_for(&self, member: &Member) -> Result<VerificationRecord, HandlerError> {
        Ok(self.deps.verifications.find(member.id).await?.unwrap_or_else(|| {
            let mut record = VerificationRecord::started(member.id, &member.username, member.global_name.clone());
            record.server_nickname = member.nickname.clone();
            record
        }))
    }

    fn audit(&self, ctx: &EventContext, member: &Member, event_type: &str, status: VerificationStatus) {
        info!(
            event_name = event_type,
            correlation_id = %ctx.correlation_id,
            user_id = %member.id,
            "verification progressed"
        );
        self.deps.audit(
            AuditEvent::new(
                &ctx.correlation_id,
                event_type,
                AuditCategory::Verification,
                Some(member.id),
                AuditOutcome::Success,
            )
            .with_metadata("status", status.label()),
        );
    }
}

pub fn nickname_modal() -> ModalTemplate {
    ModalTemplate {
        custom_id: ComponentRoute::VerifyNickname.custom_id(),
        title: "Set your nickname".to_owned(),
        inputs: vec![TextInput::short(NICKNAME_FIELD, "In-game nickname")
            .placeholder("Your character name")
            .length(Some(NICKNAME_MIN_CHARS as u16), NICKNAME_MAX_CHARS as u16)],
    }
}

#[async_trait]
impl InteractionHandler for VerificationService {
    fn feature(&self) -> Feature {
        Feature::Verification
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        match &envelope.event {
            InteractionEvent::SlashCommand { name, options } => match name.as_str() {
                CREATE_VERIFICATION_PANEL => {
                    self.post_panel(envelope, channel_option(options, CHANNEL_OPTION), ctx).await
                }
                CHECK_ROLES => self.check_roles(envelope).await,
                VERIFICATION_RESULTS => self.results(envelope).await,
                _ => Ok(HandlerResult::Ignored),
            },
            InteractionEvent::Component(action) => match ComponentRoute::parse(&action.custom_id) {
                Some(ComponentRoute::VerifyStart) => self.start(envelope, ctx).await,
                Some(ComponentRoute::VerifyNickname) => {
                    Ok(HandlerResult::effect(Effect::OpenModal(nickname_modal())))
                }
                Some(ComponentRoute::VerifyVocation(vocation)) => {
                    self.pick_vocation(envelope, vocation, ctx).await
                }
                _ => Ok(HandlerResult::Ignored),
            },
            InteractionEvent::ModalSubmit { custom_id, fields } => match ComponentRoute::parse(custom_id) {
                Some(ComponentRoute::VerifyNickname) => {
                    let raw = fields.get(NICKNAME_FIELD).map(String::as_str).unwrap_or("");
                    self.set_nickname(envelope, raw, ctx).await
                }
                _ => Ok(HandlerResult::Ignored),
            },
            InteractionEvent::Unsupported { .. } => Ok(HandlerResult::Ignored),
        }
    }
}

//! Event sign-up polls: creation, voting, result browsing and deletion.
//!
//! Live polls are cached per message in a registry guarded by one async
//! mutex. Every vote mutates the cached [`SignupLedger`] under that lock
//! before any I/O, so concurrent presses on the same poll are serialized.
//! A poll missing from the registry (restart, eviction) is rebuilt from the
//! stored event on its next vote.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use guildhall_core::audit::{AuditCategory, AuditEvent, AuditOutcome};
use guildhall_core::clock;
use guildhall_core::domain::category::Category;
use guildhall_core::domain::event::{EventRecord, ParticipantEntry, PollDraft};
use guildhall_core::domain::ids::{EventId, MessageId, UserId};
use guildhall_core::domain::member::Member;
use guildhall_core::errors::DomainError;
use guildhall_core::ledger::{PollState, SignupLedger, VoteOutcome};
use guildhall_store::repositories::events::RECENT_EVENTS_LIMIT;

use crate::blocks::{
    clip, notice, Button, ButtonStyle, Color, MessageBuilder, MessageTemplate, ModalTemplate,
    SelectMenu, SelectOption, TextInput,
};
use crate::commands::{ComponentRoute, Feature, CLEAR_POLLS, CREATE_EVENT, DELETE_EVENTS, EVENT_RESULTS};
use crate::effects::Effect;
use crate::events::{
    ComponentAction, EventContext, HandlerError, HandlerResult, InteractionEnvelope,
    InteractionEvent, InteractionHandler,
};

use super::ServiceDeps;

pub const HEADING_FIELD: &str = "heading";
/// Upper bound on events offered by the deletion picker.
pub const DELETE_PICKER_LIMIT: usize = 25;

const INVOKER_ONLY: &str = "❌ Only the member who ran the command can use this menu.";

fn capacity_field(category: Category) -> &'static str {
    match category {
        Category::Tanker => "tanker",
        Category::Healer => "healer",
        Category::Dps => "dps",
        Category::Reserve => "reserve",
    }
}

struct ActivePoll {
    record: EventRecord,
    ledger: SignupLedger,
    names: HashMap<UserId, ParticipantEntry>,
    touched: Instant,
}

impl ActivePoll {
    fn new(record: EventRecord) -> Self {
        let ledger = SignupLedger::new(record.event_id.clone(), record.capacities());
        Self { record, ledger, names: HashMap::new(), touched: Instant::now() }
    }

    fn restore(record: EventRecord) -> Self {
        let ledger =
            SignupLedger::restore(record.event_id.clone(), record.capacities(), &record.roster());
        let names = record
            .participants
            .values()
            .flatten()
            .map(|entry| (entry.user_id, entry.clone()))
            .collect();
        Self { record, ledger, names, touched: Instant::now() }
    }

    fn participants(&self) -> BTreeMap<Category, Vec<ParticipantEntry>> {
        let roster = self.ledger.roster();
        Category::ALL
            .into_iter()
            .map(|category| {
                let entries = roster[category]
                    .iter()
                    .map(|user_id| {
                        self.names.get(user_id).cloned().unwrap_or_else(|| ParticipantEntry {
                            user_id: *user_id,
                            name: format!("<@{user_id}>"),
                            server_name: None,
                            global_name: None,
                        })
                    })
                    .collect();
                (category, entries)
            })
            .collect()
    }

    fn name_of(&self, user_id: UserId) -> String {
        self.names
            .get(&user_id)
            .map(|entry| entry.server_name.clone().unwrap_or_else(|| entry.name.clone()))
            .unwrap_or_else(|| format!("<@{user_id}>"))
    }
}

fn participant_entry(member: &Member) -> ParticipantEntry {
    let display = member.display_name().to_owned();
    ParticipantEntry {
        user_id: member.id,
        name: display.clone(),
        server_name: Some(display),
        global_name: Some(member.global_name.clone().unwrap_or_else(|| member.username.clone())),
    }
}

pub struct PollService {
    deps: ServiceDeps,
    polls: Mutex<HashMap<MessageId, ActivePoll>>,
    pending_deletions: Mutex<HashMap<UserId, Vec<EventRecord>>>,
}

impl PollService {
    pub fn new(deps: ServiceDeps) -> Self {
        Self { deps, polls: Mutex::new(HashMap::new()), pending_deletions: Mutex::new(HashMap::new()) }
    }

    fn evict_expired(polls: &mut HashMap<MessageId, ActivePoll>, ttl: Duration) {
        let before = polls.len();
        polls.retain(|_, poll| poll.touched.elapsed() < ttl);
        let evicted = before - polls.len();
        if evicted > 0 {
            info!(event_name = "poll.evicted", evicted, "dropped idle polls from memory");
        }
    }

    async fn create(
        &self,
        envelope: &InteractionEnvelope,
        fields: &BTreeMap<String, String>,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_organizer(envelope).await?;
        let field = |id: &str| fields.get(id).map(String::as_str).unwrap_or("");
        let draft = PollDraft::parse(
            field(HEADING_FIELD),
            Category::ALL.map(|category| (category, field(capacity_field(category)))),
        )?;

        let author = &envelope.actor.member;
        let mut record = draft.into_record(
            EventId::generate(),
            author.id,
            author.display_name(),
            envelope.channel_id,
            clock::now_brasilia(),
        );
        let mut poll = ActivePoll::new(record.clone());
        let message_id = self
            .deps
            .platform
            .send_message(envelope.channel_id, &render_poll(&poll, None))
            .await?;
        record.message_id = Some(message_id);
        poll.record.message_id = Some(message_id);

        match self.deps.events.save(&record).await {
            Ok(outcome) => info!(
                event_name = "poll.created",
                correlation_id = %ctx.correlation_id,
                event_id = %record.event_id,
                message_id = %message_id,
                pruned = outcome.pruned,
                "poll posted and saved"
            ),
            Err(error) => warn!(
                event_name = "poll.save_failed",
                correlation_id = %ctx.correlation_id,
                event_id = %record.event_id,
                error = %error,
                "poll posted but could not be saved"
            ),
        }

        {
            let mut polls = self.polls.lock().await;
            Self::evict_expired(&mut polls, self.deps.settings.poll_ttl);
            polls.insert(message_id, poll);
        }

        self.deps.audit(
            AuditEvent::new(
                &ctx.correlation_id,
                "poll.created",
                AuditCategory::Poll,
                Some(author.id),
                AuditOutcome::Success,
            )
            .with_metadata("event_id", &record.event_id)
            .with_metadata("title", &record.title)
            .with_metadata("total_capacity", record.total_capacity()),
        );

        Ok(HandlerResult::effect(Effect::Reply(notice(format!(
            "✅ Event **{}** created! Members can sign up with the buttons below it.",
            record.title
        )))))
    }

    async fn vote(
        &self,
        envelope: &InteractionEnvelope,
        action: &ComponentAction,
        category: Category,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let voter = &envelope.actor.member;
        let mut polls = self.polls.lock().await;
        Self::evict_expired(&mut polls, self.deps.settings.poll_ttl);

        let poll = match polls.entry(action.message_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let record = self
                    .deps
                    .events
                    .find_by_message(action.message_id)
                    .await?
                    .filter(|record| record.active)
                    .ok_or_else(|| DomainError::NotFound {
                        entity: "poll",
                        id: action.message_id.to_string(),
                    })?;
                info!(
                    event_name = "poll.rehydrated",
                    correlation_id = %ctx.correlation_id,
                    event_id = %record.event_id,
                    "rebuilt poll from storage"
                );
                entry.insert(ActivePoll::restore(record))
            }
        };

        let outcome = match poll.ledger.toggle_vote(voter.id, category) {
            Ok(outcome) => outcome,
            Err(DomainError::CategoryFull { category, capacity }) => {
                return Ok(HandlerResult::effect(Effect::Reply(notice(format!(
                    "❌ **{}** is already full ({capacity}/{capacity} players)!",
                    category.label()
                )))));
            }
            Err(error) => return Err(error.into()),
        };
        poll.touched = Instant::now();
        poll.names.insert(voter.id, participant_entry(voter));

        let reply = match &outcome {
            VoteOutcome::Joined { category, .. } => {
                format!("✅ You signed up as **{}** {}!", category.label(), category.emoji())
            }
            VoteOutcome::Removed { category } => {
                format!("✅ You were removed from **{}** {}.", category.label(), category.emoji())
            }
        };
        info!(
            event_name = "poll.vote_recorded",
            correlation_id = %ctx.correlation_id,
            event_id = %poll.record.event_id,
            user_id = %voter.id,
            category = category.key(),
            outcome = ?outcome,
            registered = poll.ledger.registered(),
            "vote applied"
        );
        if poll.ledger.state() == PollState::Complete {
            info!(
                event_name = "poll.completed",
                correlation_id = %ctx.correlation_id,
                event_id = %poll.record.event_id,
                "every slot is filled"
            );
        }

        Ok(HandlerResult::Responded(vec![
            Effect::Reply(notice(reply)),
            Effect::PersistRoster {
                event_id: poll.record.event_id.clone(),
                participants: poll.participants(),
            },
            Effect::EditMessage {
                channel_id: poll.record.channel_id,
                message_id: action.message_id,
                message: render_poll(poll, Some(voter.id)),
            },
        ]))
    }

    async fn results(&self, envelope: &InteractionEnvelope) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_organizer(envelope).await?;
        let events = self.deps.events.recent(RECENT_EVENTS_LIMIT).await?;
        if events.is_empty() {
            return Ok(HandlerResult::effect(Effect::Reply(notice("❌ No events found!"))));
        }

        let listing: String = events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                format!(
                    "**{}.** {} - {}\n    Participants: {} | Created by: {}\n",
                    index + 1,
                    event.title,
                    event.short_date(),
                    event.total_registered(),
                    event.author_name
                )
            })
            .collect();
        let options = events
            .iter()
            .map(|event| {
                SelectOption::new(format!("{} - {}", event.title, event.short_date()), event.event_id.as_str())
                    .description(format!(
                        "Participants: {} | By: {}",
                        event.total_registered(),
                        event.author_name
                    ))
            })
            .collect();
        let invoker = envelope.actor.member.id;

        let message = MessageBuilder::new("")
            .embed("📋 Latest events", Color::Blue, |embed| {
                embed
                    .line("Pick an event below to see its details and participants:")
                    .field("📅 Recent events", listing, false);
            })
            .row(|row| {
                row.select(SelectMenu::new(
                    ComponentRoute::EventDetails { invoker }.custom_id(),
                    "Pick an event to see its details...",
                    options,
                ));
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn details(
        &self,
        envelope: &InteractionEnvelope,
        action: &ComponentAction,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(event_id) = action.values.first() else {
            return Err(HandlerError::Malformed("event picker sent no value".to_owned()));
        };
        let event = self
            .deps
            .events
            .find(&EventId(event_id.clone()))
            .await?
            .ok_or_else(|| DomainError::NotFound { entity: "event", id: event_id.clone() })?;
        let guild_id = envelope.guild()?;

        let mut sections = Vec::new();
        for category in Category::ALL {
            let Some(entries) = event.participants.get(&category).filter(|entries| !entries.is_empty())
            else {
                continue;
            };
            let mut lines = vec![format!("{} **{}** ({}):", category.emoji(), category.label(), entries.len())];
            for entry in entries {
                let saved = entry.server_name.as_deref().unwrap_or(&entry.name);
                let name = match self.deps.platform.member(guild_id, entry.user_id).await {
                    Ok(Some(member)) => member.display_name().to_owned(),
                    Ok(None) => format!("{saved} (no longer in the server)"),
                    Err(error) => {
                        warn!(
                            event_name = "poll.member_lookup_failed",
                            user_id = %entry.user_id,
                            error = %error,
                            "falling back to the saved name"
                        );
                        saved.to_owned()
                    }
                };
                lines.push(format!("   • {name}"));
            }
            sections.push(lines.join("\n"));
        }

        let created = event.created_at_display.clone().unwrap_or_else(|| event.short_date());
        let message = MessageBuilder::new("")
            .embed(format!("📊 Event details: {}", event.title), Color::Green, |embed| {
                embed
                    .line(format!("**📅 Time:** {}", event.time))
                    .line(format!("**📜 Bring:** {}", event.bring))
                    .line(format!("**👤 Created by:** {}", event.author_name))
                    .line(format!("**🕒 Created:** {created}"))
                    .blank();
                if sections.is_empty() {
                    embed.line("**👥 PARTICIPANTS:** nobody signed up.");
                } else {
                    embed.line(format!("**👥 PARTICIPANTS ({}):**", event.total_registered()));
                    for section in &sections {
                        embed.blank().line(section.clone());
                    }
                }
                embed.footer(format!("Event ID: {}", event.event_id));
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::UpdateSource(message)))
    }

    async fn delete_picker(&self, envelope: &InteractionEnvelope) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_organizer(envelope).await?;
        let mut events = self.deps.events.all().await?;
        if events.is_empty() {
            let message = MessageBuilder::new("")
                .embed("📋 No events found", Color::Blue, |embed| {
                    embed.line("There are no saved events to delete.");
                })
                .ephemeral()
                .build();
            return Ok(HandlerResult::effect(Effect::Reply(message)));
        }

        events.sort_by_key(|event| std::cmp::Reverse(event.created_at_parsed()));
        let total = events.len();
        events.truncate(DELETE_PICKER_LIMIT);
        let options = events
            .iter()
            .map(|event| {
                SelectOption::new(clip(&event.title, 50), event.event_id.as_str())
                    .description(format!("Created {} by {}", event.short_date(), event.author_name))
                    .emoji("📅")
            })
            .collect();
        let invoker = envelope.actor.member.id;

        let message = MessageBuilder::new("")
            .embed("🗑️ Delete events", Color::Orange, |embed| {
                embed
                    .line(format!("**{total} event(s) found** in storage."))
                    .blank()
                    .line("Pick the events to delete. Deletion is permanent once confirmed.");
                if total > DELETE_PICKER_LIMIT {
                    embed.field(
                        "⚠️ Display limit",
                        format!(
                            "Showing only the {DELETE_PICKER_LIMIT} most recent events.\nTotal stored: {total}"
                        ),
                        false,
                    );
                }
            })
            .row(|row| {
                row.select(SelectMenu::multi(
                    ComponentRoute::DeleteSelect { invoker }.custom_id(),
                    "Pick the events to delete...",
                    options,
                ));
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::Reply(message)))
    }

    async fn stage_deletion(
        &self,
        invoker: UserId,
        action: &ComponentAction,
    ) -> Result<HandlerResult, HandlerError> {
        let selected: Vec<EventRecord> = self
            .deps
            .events
            .all()
            .await?
            .into_iter()
            .filter(|event| action.values.iter().any(|id| id == event.event_id.as_str()))
            .collect();
        if selected.is_empty() {
            return Err(DomainError::NotFound { entity: "event", id: action.values.join(",") }.into());
        }

        let lines: Vec<String> = selected
            .iter()
            .map(|event| {
                format!(
                    "• **{}** · created {} by {}",
                    event.title,
                    event.created_at_display.clone().unwrap_or_else(|| event.short_date()),
                    event.author_name
                )
            })
            .collect();
        let count = selected.len();
        self.pending_deletions.lock().await.insert(invoker, selected);

        let message = MessageBuilder::new("")
            .embed("⚠️ Confirm deletion", Color::Red, |embed| {
                embed.line(format!("**You selected {count} event(s) to delete:**")).blank();
                for line in lines {
                    embed.line(line);
                }
                embed.field(
                    "⚠️ WARNING",
                    "**This cannot be undone!**\nEvery record of the selected events will be removed.",
                    false,
                );
            })
            .row(|row| {
                row.button(
                    Button::new(ComponentRoute::DeleteConfirm { invoker }.custom_id(), "Confirm deletion")
                        .emoji("🗑️")
                        .style(ButtonStyle::Danger),
                )
                .button(
                    Button::new(ComponentRoute::DeleteCancel { invoker }.custom_id(), "Cancel")
                        .emoji("❌")
                        .style(ButtonStyle::Secondary),
                );
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::UpdateSource(message)))
    }

    async fn confirm_deletion(
        &self,
        invoker: UserId,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(selected) = self.pending_deletions.lock().await.remove(&invoker) else {
            return Ok(HandlerResult::effect(Effect::UpdateSource(notice(format!(
                "⌛ That selection expired. Run /{DELETE_EVENTS} again."
            )))));
        };

        let ids: Vec<EventId> = selected.iter().map(|event| event.event_id.clone()).collect();
        let removed = self.deps.events.delete(&ids).await?;
        self.polls.lock().await.retain(|_, poll| !ids.contains(&poll.record.event_id));

        info!(
            event_name = "poll.events_deleted",
            correlation_id = %ctx.correlation_id,
            requested = ids.len(),
            removed,
            "events deleted from storage"
        );
        self.deps.audit(
            AuditEvent::new(
                &ctx.correlation_id,
                "poll.events_deleted",
                AuditCategory::Poll,
                Some(invoker),
                AuditOutcome::Success,
            )
            .with_metadata("requested", ids.len())
            .with_metadata("removed", removed),
        );

        let titles: String =
            selected.iter().map(|event| format!("• {}", event.title)).collect::<Vec<_>>().join("\n");
        let message = MessageBuilder::new("")
            .embed("✅ Events deleted", Color::Green, |embed| {
                embed
                    .line(format!("**{removed} event(s) deleted.**"))
                    .field("Removed events", titles, false);
            })
            .ephemeral()
            .build();
        Ok(HandlerResult::effect(Effect::UpdateSource(message)))
    }

    async fn cancel_deletion(&self, invoker: UserId) -> HandlerResult {
        self.pending_deletions.lock().await.remove(&invoker);
        let message = MessageBuilder::new("")
            .embed("🚫 Deletion cancelled", Color::Blue, |embed| {
                embed.line("No event was removed.");
            })
            .ephemeral()
            .build();
        HandlerResult::effect(Effect::UpdateSource(message))
    }

    async fn clear(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        self.deps.ensure_organizer(envelope).await?;
        let cleared: Vec<EventId> = {
            let mut polls = self.polls.lock().await;
            polls.drain().map(|(_, poll)| poll.record.event_id).collect()
        };
        let forgotten = cleared.len();

        // Closed polls stay closed: a later vote must not rebuild them from storage.
        for event_id in &cleared {
            if let Err(error) = self.deps.events.deactivate(event_id).await {
                warn!(
                    event_name = "poll.deactivate_failed",
                    correlation_id = %ctx.correlation_id,
                    event_id = %event_id,
                    error = %error,
                    "cleared poll could not be marked inactive"
                );
            }
        }
        info!(
            event_name = "poll.registry_cleared",
            correlation_id = %ctx.correlation_id,
            forgotten,
            "poll memory cleared"
        );
        Ok(HandlerResult::effect(Effect::Reply(notice(format!(
            "✅ Poll memory cleared ({forgotten} active poll(s) forgotten)."
        )))))
    }

    #[cfg(test)]
    async fn cached_polls(&self) -> usize {
        self.polls.lock().await.len()
    }
}

#[async_trait]
impl InteractionHandler for PollService {
    fn feature(&self) -> Feature {
        Feature::Polls
    }

    async fn handle(
        &self,
        envelope: &InteractionEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, HandlerError> {
        match &envelope.event {
            InteractionEvent::SlashCommand { name, .. } => match name.as_str() {
                CREATE_EVENT => {
                    self.deps.ensure_organizer(envelope).await?;
                    Ok(HandlerResult::effect(Effect::OpenModal(creation_modal())))
                }
                EVENT_RESULTS => self.results(envelope).await,
                DELETE_EVENTS => self.delete_picker(envelope).await,
                CLEAR_POLLS => self.clear(envelope, ctx).await,
                _ => Ok(HandlerResult::Ignored),
            },
            InteractionEvent::ModalSubmit { custom_id, fields } => {
                match ComponentRoute::parse(custom_id) {
                    Some(ComponentRoute::CreatePoll) => self.create(envelope, fields, ctx).await,
                    _ => Ok(HandlerResult::Ignored),
                }
            }
            InteractionEvent::Component(action) => {
                let Some(route) = ComponentRoute::parse(&action.custom_id) else {
                    return Ok(HandlerResult::Ignored);
                };
                let actor = envelope.actor.member.id;
                match route {
                    ComponentRoute::Vote(category) => self.vote(envelope, action, category, ctx).await,
                    ComponentRoute::EventDetails { invoker }
                    | ComponentRoute::DeleteSelect { invoker }
                    | ComponentRoute::DeleteConfirm { invoker }
                    | ComponentRoute::DeleteCancel { invoker }
                        if invoker != actor =>
                    {
                        Ok(HandlerResult::effect(Effect::Reply(notice(INVOKER_ONLY))))
                    }
                    ComponentRoute::EventDetails { .. } => self.details(envelope, action).await,
                    ComponentRoute::DeleteSelect { invoker } => self.stage_deletion(invoker, action).await,
                    ComponentRoute::DeleteConfirm { invoker } => self.confirm_deletion(invoker, ctx).await,
                    ComponentRoute::DeleteCancel { invoker } => Ok(self.cancel_deletion(invoker).await),
                    _ => Ok(HandlerResult::Ignored),
                }
            }
            InteractionEvent::Unsupported { .. } => Ok(HandlerResult::Ignored),
        }
    }
}

pub fn creation_modal() -> ModalTemplate {
    let capacity = |category: Category, label: &str| {
        TextInput::short(capacity_field(category), label).placeholder("0").length(Some(1), 2)
    };
    ModalTemplate {
        custom_id: ComponentRoute::CreatePoll.custom_id(),
        title: "Create boss event".to_owned(),
        inputs: vec![
            TextInput::short(HEADING_FIELD, "Event")
                .placeholder("e.g. Last Library : 21:00 - potions and runes")
                .length(None, 100),
            capacity(Category::Tanker, "How many TANKER (Elite Knight)?"),
            capacity(Category::Healer, "How many HEALER (Elder Druid)?"),
            capacity(Category::Dps, "How many DPS (shooters and damage)?"),
            capacity(Category::Reserve, "How many in RESERVE?"),
        ],
    }
}

/// Poll message as seen right after `viewer` acted on it.
fn render_poll(poll: &ActivePoll, viewer: Option<UserId>) -> MessageTemplate {
    let record = &poll.record;
    let ledger = &poll.ledger;
    let complete = ledger.state() == PollState::Complete;
    let buttons = ledger.control_states(viewer).into_iter().map(|control| {
        let highlighted = control.selected || control.occupied >= control.capacity as usize;
        Button::new(ComponentRoute::Vote(control.category).custom_id(), control.label)
            .emoji(control.category.emoji())
            .style(if highlighted { ButtonStyle::Success } else { ButtonStyle::Secondary })
            .disabled(control.locked)
    });

    let builder = if complete {
        MessageBuilder::new("").embed(format!("✅ EVENT COMPLETE: {}", record.title), Color::Green, |embed| {
            embed
                .line(format!("**📅 Time:** {}", record.time))
                .line(format!("**📜 Bring:** {}", record.bring))
                .blank()
                .line("**🎉 FINAL ROSTER:**");
            for category in Category::ALL {
                let slot = ledger.slot(category);
                if slot.capacity() == 0 {
                    continue;
                }
                embed.blank().line(format!(
                    "{} **{}** ({}/{}):",
                    category.emoji(),
                    category.label(),
                    slot.occupants().len(),
                    slot.capacity()
                ));
                if slot.occupants().is_empty() {
                    embed.line("   • *No players registered*");
                }
                for user_id in slot.occupants() {
                    embed.line(format!("   • {}", poll.name_of(*user_id)));
                }
            }
            embed
                .blank()
                .line(format!("**Total participants:** {}/{}", ledger.registered(), ledger.total_capacity()))
                .footer("🎉 Event closed! Every slot is filled.");
        })
    } else {
        MessageBuilder::new("").embed(format!("🎯 {}", record.title), Color::Blue, |embed| {
            embed
                .line(format!("**📅 Time:** {}", record.time))
                .line(format!("**📜 Bring:** {}", record.bring))
                .blank()
                .line("**Click a button to sign up:**")
                .blank();
            for category in Category::ALL {
                let slot = ledger.slot(category);
                if slot.capacity() > 0 {
                    embed.line(format!(
                        "{} **{}**: {}/{} slots",
                        category.emoji(),
                        category.label(),
                        slot.occupants().len(),
                        slot.capacity()
                    ));
                }
            }
            embed
                .blank()
                .line(format!("**Total registered:** {}/{} players", ledger.registered(), ledger.total_capacity()))
                .footer(format!("Created by {} • Use /{EVENT_RESULTS} for details", record.author_name));
        })
    };
    builder.button_rows(buttons).build()
}

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock;
use crate::domain::category::{Category, CategoryTable};
use crate::domain::ids::{ChannelId, EventId, MessageId, UserId};
use crate::errors::DomainError;

pub const NOT_SPECIFIED: &str = "Not specified";
pub const MAX_CAPACITY_PER_CATEGORY: u32 = 99;

/// One persisted event poll, as stored in the `eventos` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: EventId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "horario", default = "not_specified")]
    pub time: String,
    #[serde(rename = "levar", default = "not_specified")]
    pub bring: String,
    #[serde(rename = "limites", default)]
    pub limits: BTreeMap<Category, u32>,
    #[serde(rename = "data_criacao")]
    pub created_at: String,
    #[serde(rename = "data_criacao_brasilia", default, skip_serializing_if = "Option::is_none")]
    pub created_at_display: Option<String>,
    #[serde(rename = "autor_id")]
    pub author_id: UserId,
    #[serde(rename = "autor_nome")]
    pub author_name: String,
    #[serde(rename = "canal_id")]
    pub channel_id: ChannelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(rename = "ativa", default = "active_by_default")]
    pub active: bool,
    #[serde(rename = "tipo", default = "poll_kind")]
    pub kind: String,
    #[serde(rename = "participantes", default)]
    pub participants: BTreeMap<Category, Vec<ParticipantEntry>>,
    /// Store-stamped fields (`timestamp`, `ultima_atualizacao`, ...) and
    /// anything written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn not_specified() -> String {
    NOT_SPECIFIED.to_owned()
}

fn active_by_default() -> bool {
    true
}

fn poll_kind() -> String {
    "enquete".to_owned()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    pub user_id: UserId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nome_servidor", default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(rename = "nome_global", default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
}

impl EventRecord {
    /// Stored limits capped at [`MAX_CAPACITY_PER_CATEGORY`]; documents written
    /// by other tools may carry any value.
    pub fn capacities(&self) -> CategoryTable<u32> {
        CategoryTable::from_fn(|category| {
            self.limits.get(&category).copied().unwrap_or(0).min(MAX_CAPACITY_PER_CATEGORY)
        })
    }

    pub fn roster(&self) -> CategoryTable<Vec<UserId>> {
        CategoryTable::from_fn(|category| {
            self.participants
                .get(&category)
                .map(|entries| entries.iter().map(|entry| entry.user_id).collect())
                .unwrap_or_default()
        })
    }

    pub fn total_capacity(&self) -> u32 {
        self.capacities().iter().fold(0, |total, (_, capacity)| total.saturating_add(*capacity))
    }

    pub fn total_registered(&self) -> usize {
        self.participants.values().map(Vec::len).sum()
    }

    /// Name recorded for a participant at the last roster save.
    pub fn saved_name(&self, user_id: UserId) -> Option<&str> {
        self.participants
            .values()
            .flatten()
            .find(|entry| entry.user_id == user_id)
            .map(|entry| entry.server_name.as_deref().unwrap_or(&entry.name))
    }

    pub fn created_at_parsed(&self) -> Option<DateTime<FixedOffset>> {
        clock::parse_stamp(&self.created_at)
    }

    /// Short `dd/mm/YYYY HH:MM` label used in pickers.
    pub fn short_date(&self) -> String {
        match self.created_at_parsed() {
            Some(at) => at.format("%d/%m/%Y %H:%M").to_string(),
            None => "unknown date".to_owned(),
        }
    }
}

/// Validated input for a new event poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollDraft {
    pub title: String,
    pub time: String,
    pub bring: String,
    pub capacities: CategoryTable<u32>,
}

impl PollDraft {
    /// Builds a draft from the raw creation form. The heading follows
    /// `Title : time - what to bring`; missing parts fall back to
    /// [`NOT_SPECIFIED`].
    pub fn parse(heading: &str, capacities: [(Category, &str); 4]) -> Result<Self, DomainError> {
        let (title, time, bring) = split_heading(heading);
        if title.is_empty() {
            return Err(DomainError::InvalidInput("The event needs a title.".to_owned()));
        }

        let mut table = CategoryTable::<u32>::default();
        for (category, raw) in capacities {
            table[category] = parse_capacity(category, raw)?;
        }
        if table.iter().all(|(_, capacity)| *capacity == 0) {
            return Err(DomainError::InvalidInput(
                "At least one category needs a limit above zero.".to_owned(),
            ));
        }

        Ok(Self { title, time, bring, capacities: table })
    }

    pub fn total_capacity(&self) -> u32 {
        self.capacities.iter().fold(0, |total, (_, capacity)| total.saturating_add(*capacity))
    }

    pub fn into_record(
        self,
        event_id: EventId,
        author_id: UserId,
        author_name: impl Into<String>,
        channel_id: ChannelId,
        created_at: DateTime<FixedOffset>,
    ) -> EventRecord {
        EventRecord {
            event_id,
            title: self.title,
            time: self.time,
            bring: self.bring,
            limits: self.capacities.iter().map(|(category, cap)| (category, *cap)).collect(),
            created_at: clock::stamp(created_at),
            created_at_display: Some(created_at.format("%d/%m/%Y às %H:%M:%S").to_string()),
            author_id,
            author_name: author_name.into(),
            channel_id,
            message_id: None,
            active: true,
            kind: poll_kind(),
            participants: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

fn split_heading(heading: &str) -> (String, String, String) {
    let heading = heading.trim();
    let (title, tail) = match heading.split_once(':') {
        Some((title, rest)) => (title.trim(), rest),
        None => match heading.split_once('-') {
            Some((title, rest)) => (title.trim(), rest),
            None => (heading, ""),
        },
    };

    // With a `:` the tail is `time - bring`; without one it is only `bring`.
    let (time, bring) = if heading.contains(':') {
        match tail.split_once('-') {
            Some((time, after)) => (time, after.rsplit('-').next().unwrap_or(after)),
            None => (tail, ""),
        }
    } else {
        ("", tail.rsplit('-').next().unwrap_or(tail))
    };

    (title.to_owned(), or_not_specified(time), or_not_specified(bring))
}

fn or_not_specified(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        not_specified()
    } else {
        value.to_owned()
    }
}

fn parse_capacity(category: Category, raw: &str) -> Result<u32, DomainError> {
    let raw = raw.trim();
    let value = raw.parse::<i64>().map_err(|_| {
        DomainError::InvalidInput(format!(
            "The limit for {category} must be a whole number (got `{raw}`)."
        ))
    })?;
    if value < 0 {
        return Err(DomainError::InvalidInput(format!(
            "The limit for {category} cannot be negative."
        )));
    }
    if value > i64::from(MAX_CAPACITY_PER_CATEGORY) {
        return Err(DomainError::InvalidInput(format!(
            "The limit for {category} cannot exceed {MAX_CAPACITY_PER_CATEGORY}."
        )));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::clock;
    use crate::domain::category::Category;
    use crate::domain::ids::{ChannelId, EventId, UserId};
    use crate::errors::DomainError;

    use super::{EventRecord, PollDraft, MAX_CAPACITY_PER_CATEGORY, NOT_SPECIFIED};

    fn limits<'a>(t: &'a str, h: &'a str, d: &'a str, r: &'a str) -> [(Category, &'a str); 4] {
        [(Category::Tanker, t), (Category::Healer, h), (Category::Dps, d), (Category::Reserve, r)]
    }

    #[test]
    fn heading_splits_into_title_time_and_bring() {
        let draft = PollDraft::parse("Last Library : 21:00 - potions", limits("1", "1", "3", "0"))
            .expect("valid draft");

        assert_eq!(draft.title, "Last Library");
        assert_eq!(draft.time, "21:00");
        assert_eq!(draft.bring, "potions");
        assert_eq!(draft.total_capacity(), 5);
    }

    #[test]
    fn heading_without_separators_uses_placeholders() {
        let draft = PollDraft::parse("Ferumbras", limits("1", "0", "0", "0")).expect("valid");
        assert_eq!(draft.title, "Ferumbras");
        assert_eq!(draft.time, NOT_SPECIFIED);
        assert_eq!(draft.bring, NOT_SPECIFIED);
    }

    #[test]
    fn hyphenated_title_without_bring_keeps_bring_unspecified() {
        let draft = PollDraft::parse("Ice-Queen : 21:00", limits("1", "0", "0", "0")).expect("valid");
        assert_eq!(draft.title, "Ice-Queen");
        assert_eq!(draft.time, "21:00");
        assert_eq!(draft.bring, NOT_SPECIFIED);

        let draft = PollDraft::parse("Ice-Queen : 21:00 - food - potions", limits("1", "0", "0", "0"))
            .expect("valid");
        assert_eq!(draft.title, "Ice-Queen");
        assert_eq!(draft.time, "21:00");
        assert_eq!(draft.bring, "potions");
    }

    #[test]
    fn heading_without_time_takes_bring_after_the_dash() {
        let draft = PollDraft::parse("Ferumbras - potions", limits("1", "0", "0", "0")).expect("valid");
        assert_eq!(draft.title, "Ferumbras");
        assert_eq!(draft.time, NOT_SPECIFIED);
        assert_eq!(draft.bring, "potions");
    }

    #[test]
    fn oversized_stored_limits_are_capped() {
        let raw = json!({
            "event_id": "e-9",
            "titulo": "Boss",
            "limites": {"TANKER": u32::MAX, "HEALER": 1, "DPS": u32::MAX, "RESERVA": 0},
            "data_criacao": "2025-03-14T20:30:05-03:00",
            "autor_id": 10,
            "autor_nome": "Lead",
            "canal_id": 20
        });

        let record: EventRecord = serde_json::from_value(raw).expect("decode");
        assert_eq!(record.capacities()[Category::Tanker], MAX_CAPACITY_PER_CATEGORY);
        assert_eq!(record.capacities()[Category::Healer], 1);
        assert_eq!(record.total_capacity(), 2 * MAX_CAPACITY_PER_CATEGORY + 1);
    }

    #[test]
    fn negative_or_non_numeric_limits_are_rejected() {
        assert!(matches!(
            PollDraft::parse("Boss : 20h", limits("-1", "1", "1", "1")),
            Err(DomainError::InvalidInput(message)) if message.contains("TANKER")
        ));
        assert!(PollDraft::parse("Boss : 20h", limits("1", "x", "1", "1")).is_err());
        assert!(PollDraft::parse("Boss : 20h", limits("0", "0", "0", "0")).is_err());
    }

    #[test]
    fn record_round_trips_with_legacy_field_names_and_extras() {
        let raw = json!({
            "event_id": "e-1",
            "titulo": "Boss",
            "horario": "21:00",
            "levar": "potions",
            "limites": {"TANKER": 1, "DPS": 2, "RESERVA": 0},
            "data_criacao": "2025-03-14T20:30:05-03:00",
            "autor_id": 10,
            "autor_nome": "Lead",
            "canal_id": 20,
            "message_id": 30,
            "ativa": true,
            "tipo": "enquete",
            "participantes": {"TANKER": [{"user_id": 1, "nome": "Knight", "nome_servidor": "Knight"}]},
            "timestamp": "2025-03-14T20:30:06-03:00"
        });

        let record: EventRecord = serde_json::from_value(raw.clone()).expect("decode");
        assert_eq!(record.capacities()[Category::Dps], 2);
        assert_eq!(record.roster()[Category::Tanker], vec![UserId(1)]);
        assert_eq!(record.saved_name(UserId(1)), Some("Knight"));
        assert!(record.extra.contains_key("timestamp"));

        let encoded = serde_json::to_value(&record).expect("encode");
        assert_eq!(encoded["participantes"]["TANKER"][0]["nome"], "Knight");
        assert_eq!(encoded["timestamp"], raw["timestamp"]);
    }

    #[test]
    fn draft_becomes_active_poll_record() {
        let draft = PollDraft::parse("Boss : 21:00 - food", limits("1", "1", "2", "1"))
            .expect("valid");
        let record = draft.into_record(
            EventId("e-2".to_owned()),
            UserId(5),
            "Lead",
            ChannelId(6),
            clock::now_brasilia(),
        );

        assert!(record.active);
        assert_eq!(record.kind, "enquete");
        assert_eq!(record.total_capacity(), 5);
        assert!(record.created_at_parsed().is_some());
        assert!(record.message_id.is_none());
    }
}

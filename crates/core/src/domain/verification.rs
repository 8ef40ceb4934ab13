use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::ids::UserId;
use crate::errors::DomainError;

pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 32;
const FORBIDDEN_NICKNAME_FRAGMENTS: [&str; 4] = ["@", "#", ":", "```"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vocation {
    #[serde(rename = "EK")]
    EliteKnight,
    #[serde(rename = "MS")]
    MasterSorcerer,
    #[serde(rename = "RP")]
    RoyalPaladin,
    #[serde(rename = "ED")]
    ElderDruid,
    #[serde(rename = "MK")]
    Monk,
}

impl Vocation {
    pub const ALL: [Vocation; 5] = [
        Self::EliteKnight,
        Self::MasterSorcerer,
        Self::RoyalPaladin,
        Self::ElderDruid,
        Self::Monk,
    ];

    /// Short code, which is also the name of the matching guild role.
    pub fn code(self) -> &'static str {
        match self {
            Self::EliteKnight => "EK",
            Self::MasterSorcerer => "MS",
            Self::RoyalPaladin => "RP",
            Self::ElderDruid => "ED",
            Self::Monk => "MK",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::EliteKnight => "Elite Knight",
            Self::MasterSorcerer => "Master Sorcerer",
            Self::RoyalPaladin => "Royal Paladin",
            Self::ElderDruid => "Elder Druid",
            Self::Monk => "Monk",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::EliteKnight => "🛡️",
            Self::MasterSorcerer => "🔮",
            Self::RoyalPaladin => "🏹",
            Self::ElderDruid => "🌟",
            Self::Monk => "👊",
        }
    }

    pub fn role_summary(self) -> &'static str {
        match self {
            Self::EliteKnight => "Tank and protection",
            Self::MasterSorcerer => "Magic damage",
            Self::RoyalPaladin => "Ranged damage",
            Self::ElderDruid => "Support and healing",
            Self::Monk => "Close combat",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|vocation| vocation.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Vocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerificationStatus {
    #[serde(rename = "verificacao_iniciada")]
    Started,
    #[serde(rename = "nickname_definido")]
    NicknameSet,
    #[serde(rename = "verificacao_concluida")]
    Completed,
}

impl VerificationStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Started => "⏳ Started",
            Self::NicknameSet => "📝 Nickname set",
            Self::Completed => "✅ Completed",
        }
    }
}

/// One member's onboarding progress, as stored in the `verificacoes` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub user_id: UserId,
    #[serde(rename = "nick_discord")]
    pub username: String,
    #[serde(rename = "nome_global")]
    pub global_name: String,
    #[serde(rename = "nick_atual_servidor", default)]
    pub server_nickname: Option<String>,
    #[serde(rename = "vocacao", default)]
    pub vocation: Option<Vocation>,
    pub status: VerificationStatus,
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub recorded_at_display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VerificationRecord {
    pub fn started(user_id: UserId, username: impl Into<String>, global_name: Option<String>) -> Self {
        let username = username.into();
        Self {
            user_id,
            global_name: global_name.unwrap_or_else(|| username.clone()),
            username,
            server_nickname: None,
            vocation: None,
            status: VerificationStatus::Started,
            recorded_at_display: None,
            timestamp: None,
            extra: Map::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.server_nickname.as_deref().unwrap_or(&self.username)
    }
}

/// Aggregate counts shown in the verification report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationStats {
    pub by_vocation: BTreeMap<Option<Vocation>, usize>,
    pub by_status: BTreeMap<VerificationStatus, usize>,
}

impl VerificationStats {
    pub fn collect<'a>(records: impl IntoIterator<Item = &'a VerificationRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            *stats.by_vocation.entry(record.vocation).or_default() += 1;
            *stats.by_status.entry(record.status).or_default() += 1;
        }
        stats
    }
}

/// Trims and checks a requested server nickname.
pub fn validate_nickname(raw: &str) -> Result<String, DomainError> {
    let nickname = raw.trim();
    let length = nickname.chars().count();

    if length < NICKNAME_MIN_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "The nickname must have at least {NICKNAME_MIN_CHARS} characters."
        )));
    }
    if length > NICKNAME_MAX_CHARS {
        return Err(DomainError::InvalidInput(format!(
            "The nickname can have at most {NICKNAME_MAX_CHARS} characters."
        )));
    }
    if FORBIDDEN_NICKNAME_FRAGMENTS.iter().any(|fragment| nickname.contains(fragment)) {
        return Err(DomainError::InvalidInput(
            "The nickname cannot contain @, #, : or ```.".to_owned(),
        ));
    }

    Ok(nickname.to_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::domain::ids::UserId;

    use super::{
        validate_nickname, VerificationRecord, VerificationStats, VerificationStatus, Vocation,
    };

    #[test]
    fn nickname_is_trimmed_and_checked() {
        assert_eq!(validate_nickname("  [EK 900+] Noctiis ").expect("valid"), "[EK 900+] Noctiis");
        assert!(validate_nickname(" x ").is_err());
        assert!(validate_nickname("name#1234").is_err());
        assert!(validate_nickname("a```b").is_err());
        assert!(validate_nickname(&"n".repeat(33)).is_err());
        assert!(validate_nickname(&"n".repeat(32)).is_ok());
    }

    #[test]
    fn record_uses_legacy_field_names() {
        let raw = json!({
            "user_id": 7,
            "nick_discord": "noctiis",
            "nome_global": "Noctiis",
            "nick_atual_servidor": null,
            "vocacao": "MK",
            "status": "verificacao_concluida",
            "data": "14/03/2025 às 20:30:05 (Brasília)",
            "timestamp": "2025-03-14T20:30:05-03:00"
        });

        let record: VerificationRecord = serde_json::from_value(raw).expect("decode");
        assert_eq!(record.user_id, UserId(7));
        assert_eq!(record.vocation, Some(Vocation::Monk));
        assert_eq!(record.status, VerificationStatus::Completed);
        assert_eq!(record.display_name(), "noctiis");

        let encoded = serde_json::to_value(&record).expect("encode");
        assert_eq!(encoded["vocacao"], "MK");
        assert_eq!(encoded["nick_atual_servidor"], serde_json::Value::Null);
    }

    #[test]
    fn stats_count_missing_vocations_separately() {
        let mut done = VerificationRecord::started(UserId(1), "a", None);
        done.vocation = Some(Vocation::ElderDruid);
        done.status = VerificationStatus::Completed;
        let pending = VerificationRecord::started(UserId(2), "b", Some("B".to_owned()));

        let stats = VerificationStats::collect([&done, &pending]);

        assert_eq!(stats.by_vocation.get(&Some(Vocation::ElderDruid)), Some(&1));
        assert_eq!(stats.by_vocation.get(&None), Some(&1));
        assert_eq!(stats.by_status.get(&VerificationStatus::Started), Some(&1));
        assert_eq!(pending.global_name, "B");
    }

    #[test]
    fn vocation_codes_match_role_names() {
        assert_eq!(Vocation::from_code("ed"), Some(Vocation::ElderDruid));
        assert_eq!(Vocation::from_code("XX"), None);
        assert_eq!(Vocation::ALL.map(Vocation::code), ["EK", "MS", "RP", "ED", "MK"]);
    }
}

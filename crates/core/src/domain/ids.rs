use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! snowflake_id {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl std::str::FromStr for $name {
                type Err = std::num::ParseIntError;

                fn from_str(value: &str) -> Result<Self, Self::Err> {
                    value.trim().parse::<u64>().map(Self)
                }
            }
        )+
    };
}

snowflake_id!(UserId, GuildId, ChannelId, MessageId, RoleId);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventId, UserId};

    #[test]
    fn snowflakes_serialize_as_bare_numbers() {
        let encoded = serde_json::to_string(&UserId(112233445566778899)).expect("serialize");
        assert_eq!(encoded, "112233445566778899");
        assert_eq!("  42 ".parse::<UserId>().expect("parse"), UserId(42));
    }

    #[test]
    fn generated_event_ids_are_unique_uuids() {
        let first = EventId::generate();
        let second = EventId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 36);
    }
}

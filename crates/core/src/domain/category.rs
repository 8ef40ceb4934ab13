use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Role slot a participant can sign up for in an event poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "TANKER")]
    Tanker,
    #[serde(rename = "HEALER")]
    Healer,
    #[serde(rename = "DPS")]
    Dps,
    #[serde(rename = "RESERVA", alias = "RESERVE")]
    Reserve,
}

impl Category {
    pub const ALL: [Category; 4] = [Self::Tanker, Self::Healer, Self::Dps, Self::Reserve];

    pub fn index(self) -> usize {
        match self {
            Self::Tanker => 0,
            Self::Healer => 1,
            Self::Dps => 2,
            Self::Reserve => 3,
        }
    }

    /// Wire name used in persisted documents and component ids.
    pub fn key(self) -> &'static str {
        match self {
            Self::Tanker => "TANKER",
            Self::Healer => "HEALER",
            Self::Dps => "DPS",
            Self::Reserve => "RESERVA",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tanker => "TANKER",
            Self::Healer => "HEALER",
            Self::Dps => "DPS",
            Self::Reserve => "RESERVE",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Tanker => "🛡️",
            Self::Healer => "🚑",
            Self::Dps => "⚔️",
            Self::Reserve => "🔄",
        }
    }

    pub fn from_key(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TANKER" | "TANK" => Some(Self::Tanker),
            "HEALER" | "HEAL" => Some(Self::Healer),
            "DPS" => Some(Self::Dps),
            "RESERVA" | "RESERVE" => Some(Self::Reserve),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed-size table holding one value per [`Category`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryTable<T> {
    slots: [T; 4],
}

impl<T> CategoryTable<T> {
    pub fn from_fn(mut build: impl FnMut(Category) -> T) -> Self {
        Self { slots: Category::ALL.map(&mut build) }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn map<U>(&self, mut transform: impl FnMut(Category, &T) -> U) -> CategoryTable<U> {
        CategoryTable::from_fn(|category| transform(category, &self[category]))
    }
}

impl<T> Index<Category> for CategoryTable<T> {
    type Output = T;

    fn index(&self, category: Category) -> &Self::Output {
        &self.slots[category.index()]
    }
}

impl<T> IndexMut<Category> for CategoryTable<T> {
    fn index_mut(&mut self, category: Category) -> &mut Self::Output {
        &mut self.slots[category.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryTable};

    #[test]
    fn reserve_accepts_both_wire_names() {
        let legacy: Category = serde_json::from_str("\"RESERVA\"").expect("legacy name");
        let english: Category = serde_json::from_str("\"RESERVE\"").expect("alias");
        assert_eq!(legacy, Category::Reserve);
        assert_eq!(english, Category::Reserve);
        assert_eq!(serde_json::to_string(&Category::Reserve).expect("serialize"), "\"RESERVA\"");
    }

    #[test]
    fn table_iterates_in_display_order() {
        let table = CategoryTable::from_fn(|category| category.index() * 10);
        let order: Vec<_> = table.iter().map(|(category, _)| category).collect();
        assert_eq!(order, Category::ALL.to_vec());
        assert_eq!(table[Category::Dps], 20);
    }

    #[test]
    fn from_key_is_case_insensitive() {
        assert_eq!(Category::from_key(" dps "), Some(Category::Dps));
        assert_eq!(Category::from_key("support"), None);
    }
}

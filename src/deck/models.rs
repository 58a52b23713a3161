use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rarity::RarityTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Owned,
    Resold,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Owned => "OWNED",
            ItemStatus::Resold => "RESOLD",
        }
    }
}

impl TryFrom<&str> for ItemStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "OWNED" => Ok(ItemStatus::Owned),
            "RESOLD" => Ok(ItemStatus::Resold),
            _ => Err(s.to_string()),
        }
    }
}

/// A generated creature in the player's deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String, // Opaque id assigned by the generator
    pub name: String,
    pub rarity: RarityTag,
    pub image_base64: String, // Image payload without the data-url prefix
    pub generated_at: DateTime<Utc>,
    pub status: ItemStatus,
}

impl Item {
    /// Freshly generated items always start out owned.
    pub fn new_owned(
        id: impl Into<String>,
        name: impl Into<String>,
        rarity: impl Into<RarityTag>,
        image_base64: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity: rarity.into(),
            image_base64: image_base64.into(),
            generated_at,
            status: ItemStatus::Owned,
        }
    }

    pub fn is_owned(&self) -> bool {
        self.status == ItemStatus::Owned
    }

    pub fn is_resold(&self) -> bool {
        self.status == ItemStatus::Resold
    }
}

/// Orderings offered when listing a deck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeckSortOrder {
    #[default]
    DateDesc,
    DateAsc,
    RarityDesc,
    RarityAsc,
    NameAsc,
    NameDesc,
}

/// Returns a sorted copy. Rarity orderings break ties by name so archived
/// decks list the same way every time.
pub fn sort_items(items: &[Item], order: DeckSortOrder) -> Vec<Item> {
    let mut sorted = items.to_vec();
    match order {
        DeckSortOrder::DateDesc => sorted.sort_by(|a, b| b.generated_at.cmp(&a.generated_at)),
        DeckSortOrder::DateAsc => sorted.sort_by(|a, b| a.generated_at.cmp(&b.generated_at)),
        DeckSortOrder::RarityDesc => sorted.sort_by(|a, b| {
            b.rarity
                .rank()
                .cmp(&a.rarity.rank())
                .then_with(|| a.name.cmp(&b.name))
        }),
        DeckSortOrder::RarityAsc => sorted.sort_by(|a, b| {
            a.rarity
                .rank()
                .cmp(&b.rarity.rank())
                .then_with(|| a.name.cmp(&b.name))
        }),
        DeckSortOrder::NameAsc => sorted.sort_by(|a, b| a.name.cmp(&b.name)),
        DeckSortOrder::NameDesc => sorted.sort_by(|a, b| b.name.cmp(&a.name)),
    }
    sorted
}

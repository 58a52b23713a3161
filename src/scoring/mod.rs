pub mod components;
pub mod scorer;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::deck::Item;

pub use scorer::{compute_score, round_half_up, DeckScorer, DeckScorerBuilder, ScoreBreakdown};

/// Priority constants for score components.
/// Lower values run first; the order only affects how a breakdown is listed
/// since every component is additive.
pub mod component_priority {
    /// Points for creatures still in the deck
    pub const OWNED: u32 = 100;
    /// Points for creatures that were resold
    pub const RESOLD: u32 = 200;
    /// Conversion of the remaining token balance
    pub const TOKENS: u32 = 300;
    /// Flat bonuses and reported-only terms
    pub const BONUS: u32 = 400;
}

/// Identifies which scoring formula produced a score. Stored on every
/// archive so historical scores are never reinterpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringVersion {
    /// Flat owned table plus one point per resold creature
    V1,
    /// Top/overflow split plus token conversion
    V2,
}

pub const CURRENT_SCORING_VERSION: ScoringVersion = ScoringVersion::V2;

impl ScoringVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringVersion::V1 => "v1",
            ScoringVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for ScoringVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ScoringVersion {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "v1" => Ok(ScoringVersion::V1),
            "v2" => Ok(ScoringVersion::V2),
            _ => Err(s.to_string()),
        }
    }
}

/// Everything a component may look at when scoring a deck.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub items: &'a [Item],
    pub token_balance: i64,
    pub quick_flip_bonus: i64,
}

impl<'a> ScoringInput<'a> {
    pub fn new(items: &'a [Item], token_balance: i64, quick_flip_bonus: i64) -> Self {
        Self {
            items,
            token_balance,
            quick_flip_bonus,
        }
    }

    /// Owned items, highest rarity first. The sort is stable so equal
    /// tiers keep their deck order.
    pub fn owned_by_rarity_desc(&self) -> Vec<&'a Item> {
        let mut owned: Vec<&Item> = self.items.iter().filter(|i| i.is_owned()).collect();
        owned.sort_by(|a, b| b.rarity.rank().cmp(&a.rarity.rank()));
        owned
    }

    pub fn resold(&self) -> impl Iterator<Item = &'a Item> {
        self.items.iter().filter(|i| i.is_resold())
    }
}

/// One additive term of a deck score. Components return unrounded values;
/// the scorer rounds the sum exactly once.
pub trait ScoreComponent: Send + Sync {
    fn name(&self) -> &'static str;

    fn contribution(&self, input: &ScoringInput) -> f64;

    fn priority(&self) -> u32;

    /// Reported-only components show up in a breakdown but are left out
    /// of the total.
    fn counts_toward_total(&self) -> bool {
        true
    }
}

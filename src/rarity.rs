use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// The eight rarity tiers a generated creature can roll, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Rarity {
    F,
    E,
    D,
    C,
    B,
    A,
    S,
    #[serde(rename = "S+")]
    SPlus,
}

/// Lowest tier that counts towards the set bonus.
pub const SET_BONUS_THRESHOLD: Rarity = Rarity::B;

/// Lowest tier that marks a session as having sold something precious.
pub const HIGH_RARITY_THRESHOLD: Rarity = Rarity::S;

impl Rarity {
    /// Position in the total order, F = 0 through S+ = 7.
    pub fn rank(self) -> usize {
        match self {
            Rarity::F => 0,
            Rarity::E => 1,
            Rarity::D => 2,
            Rarity::C => 3,
            Rarity::B => 4,
            Rarity::A => 5,
            Rarity::S => 6,
            Rarity::SPlus => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::F => "F",
            Rarity::E => "E",
            Rarity::D => "D",
            Rarity::C => "C",
            Rarity::B => "B",
            Rarity::A => "A",
            Rarity::S => "S",
            Rarity::SPlus => "S+",
        }
    }

    /// Parses a tag, treating anything unrecognised as the lowest tier.
    pub fn parse_lossy(tag: &str) -> Self {
        Rarity::try_from(tag).unwrap_or(Rarity::F)
    }

    pub fn resell_value(self) -> u32 {
        BALANCE_TABLE.resell_refunds[self.rank()]
    }

    pub fn owned_score_weight(self) -> f64 {
        BALANCE_TABLE.owned_score[self.rank()]
    }

    pub fn resold_score_weight(self) -> f64 {
        BALANCE_TABLE.resold_score[self.rank()]
    }

    /// Legacy v1 owned table. Same values as the current owned weights,
    /// kept separate so a rebalance of v2 never rewrites v1 semantics.
    pub fn legacy_owned_score(self) -> u32 {
        LEGACY_OWNED_SCORE[self.rank()]
    }

    pub fn is_high(self) -> bool {
        self >= HIGH_RARITY_THRESHOLD
    }
}

impl PartialOrd for Rarity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rarity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Rarity {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Rarity::iter()
            .find(|rarity| rarity.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Returns true when `tag` names one of the eight known tiers.
pub fn is_valid_rarity(tag: &str) -> bool {
    Rarity::try_from(tag).is_ok()
}

/// Per-tier refund and score weights, indexed by [`Rarity::rank`].
#[derive(Debug, Clone, Copy)]
pub struct RarityTable {
    pub resell_refunds: [u32; 8],
    pub owned_score: [f64; 8],
    pub resold_score: [f64; 8],
}

pub const BALANCE_TABLE: RarityTable = RarityTable {
    resell_refunds: [1, 2, 3, 4, 6, 10, 15, 25],
    owned_score: [1.0, 2.0, 4.0, 7.0, 12.0, 20.0, 35.0, 55.0],
    resold_score: [0.0, 0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0],
};

const LEGACY_OWNED_SCORE: [u32; 8] = [1, 2, 4, 7, 12, 20, 35, 55];

/// A rarity as it was persisted or received. Unknown tags are kept verbatim
/// so a corrupted record round-trips unchanged, but every lookup on it
/// behaves as tier F.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RarityTag {
    Known(Rarity),
    Unrecognized(String),
}

impl RarityTag {
    pub fn is_valid(&self) -> bool {
        matches!(self, RarityTag::Known(_))
    }

    /// The tier used for scoring, sorting and display.
    pub fn effective(&self) -> Rarity {
        match self {
            RarityTag::Known(rarity) => *rarity,
            RarityTag::Unrecognized(_) => Rarity::F,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RarityTag::Known(rarity) => rarity.as_str(),
            RarityTag::Unrecognized(raw) => raw,
        }
    }

    pub fn rank(&self) -> usize {
        self.effective().rank()
    }

    pub fn resell_value(&self) -> u32 {
        self.effective().resell_value()
    }

    pub fn owned_score_weight(&self) -> f64 {
        self.effective().owned_score_weight()
    }

    pub fn resold_score_weight(&self) -> f64 {
        self.effective().resold_score_weight()
    }
}

impl From<Rarity> for RarityTag {
    fn from(rarity: Rarity) -> Self {
        RarityTag::Known(rarity)
    }
}

impl From<String> for RarityTag {
    fn from(raw: String) -> Self {
        match Rarity::try_from(raw.as_str()) {
            Ok(rarity) => RarityTag::Known(rarity),
            Err(_) => RarityTag::Unrecognized(raw),
        }
    }
}

impl From<&str> for RarityTag {
    fn from(raw: &str) -> Self {
        RarityTag::from(raw.to_string())
    }
}

impl From<RarityTag> for String {
    fn from(tag: RarityTag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for RarityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

use std::fmt;

use serde::Serialize;

use crate::{
    deck::{sort_items, DeckSortOrder, Item},
    scoring::ScoreBreakdown,
    store::{ArchivedGame, ResellReceipt},
    telemetry::ArchiveTelemetry,
};

/// Where the session lifecycle currently stands. Viewing the Hall of Fame
/// is tracked separately since it never ends a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    NoActiveGame,
    ActiveGame,
    Archiving,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::NoActiveGame => write!(f, "no active game"),
            SessionPhase::ActiveGame => write!(f, "active game"),
            SessionPhase::Archiving => write!(f, "archiving"),
        }
    }
}

/// What the launch screen needs to offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchState {
    pub phase: SessionPhase,
    pub can_continue: bool,
    pub has_unarchived_progress: bool,
}

impl LaunchState {
    /// Used whenever the store cannot be read at startup
    pub fn fallback() -> Self {
        Self {
            phase: SessionPhase::NoActiveGame,
            can_continue: false,
            has_unarchived_progress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub archived: Option<ArchivedGame>,
    pub token_balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueOutcome {
    pub item_count: usize,
    pub token_balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutcome {
    pub item: Item,
    pub token_balance: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResellOutcome {
    pub item: Item,
    pub refund: i64,
    pub token_balance: i64,
    pub quick_flip: bool,
}

impl ResellOutcome {
    pub fn new(receipt: ResellReceipt, quick_flip: bool) -> Self {
        Self {
            item: receipt.item,
            refund: receipt.refund,
            token_balance: receipt.new_balance,
            quick_flip,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndGameOutcome {
    pub archived: Option<ArchivedGame>,
}

/// The live deck together with its provisional score.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckView {
    pub phase: SessionPhase,
    pub items: Vec<Item>,
    pub token_balance: i64,
    pub generation_cost: i64,
    pub can_generate: bool,
    pub score: ScoreBreakdown,
}

/// An archive as listed in the Hall of Fame, items sorted rarest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HallOfFameEntry {
    pub id: String,
    pub score: i64,
    pub token_balance: i64,
    pub archive_date: chrono::DateTime<chrono::Utc>,
    pub scored_by_version: String,
    pub telemetry: Option<ArchiveTelemetry>,
    pub items: Vec<Item>,
}

impl From<ArchivedGame> for HallOfFameEntry {
    fn from(archive: ArchivedGame) -> Self {
        Self {
            items: sort_items(&archive.items, DeckSortOrder::RarityDesc),
            id: archive.id,
            score: archive.score,
            token_balance: archive.token_balance,
            archive_date: archive.archive_date,
            scored_by_version: archive.scored_by_version,
            telemetry: archive.telemetry,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HallOfFameView {
    /// Newest first
    pub entries: Vec<HallOfFameEntry>,
    pub return_to: SessionPhase,
}

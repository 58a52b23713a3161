use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    deck::Item, rarity::Rarity, scoring::ScoringVersion, telemetry::ArchiveTelemetry,
};

/// Persisted schema version. Bumps may only add collections so archives
/// written by older versions stay readable.
pub const SCHEMA_VERSION: u32 = 3;

/// Well-known key of the token balance in the settings collection.
pub const TOKEN_BALANCE_KEY: &str = "tokenBalance";

/// Well-known key of the singleton app state record.
pub const APP_STATE_KEY: &str = "currentAppState";

/// The four logical collections of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Items,
    Settings,
    AppState,
    Archives,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Items => "minimons",
            Collection::Settings => "settings",
            Collection::AppState => "appState",
            Collection::Archives => "archives",
        }
    }

    /// Schema version that introduced the collection.
    pub fn since_version(self) -> u32 {
        match self {
            Collection::Items | Collection::Settings => 1,
            Collection::AppState | Collection::Archives => 3,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Singleton record describing whether a session is in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateRecord {
    pub has_active_game: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played_date: Option<DateTime<Utc>>,
}

impl AppStateRecord {
    pub fn active_now() -> Self {
        Self {
            has_active_game: true,
            last_played_date: Some(Utc::now()),
        }
    }

    pub fn inactive_now() -> Self {
        Self {
            has_active_game: false,
            last_played_date: Some(Utc::now()),
        }
    }
}

fn legacy_scoring_tag() -> String {
    ScoringVersion::V1.as_str().to_string()
}

/// Immutable Hall of Fame entry. The score is computed once, at archival,
/// and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedGame {
    pub id: String,
    pub score: i64,
    pub token_balance: i64,
    #[serde(alias = "minimons")]
    pub items: Vec<Item>,
    pub archive_date: DateTime<Utc>,
    /// Absent on archives written before telemetry existed
    #[serde(default)]
    pub telemetry: Option<ArchiveTelemetry>,
    #[serde(default = "legacy_scoring_tag")]
    pub scored_by_version: String,
}

impl ArchivedGame {
    pub fn new(
        score: i64,
        token_balance: i64,
        items: Vec<Item>,
        telemetry: ArchiveTelemetry,
        scored_by_version: &str,
        archive_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_archive_id(archive_date),
            score,
            token_balance,
            items,
            archive_date,
            telemetry: Some(telemetry),
            scored_by_version: scored_by_version.to_string(),
        }
    }

    /// `None` when the archive was scored by a formula this build does not know.
    pub fn scoring_version(&self) -> Option<ScoringVersion> {
        ScoringVersion::try_from(self.scored_by_version.as_str()).ok()
    }
}

fn new_archive_id(archive_date: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("archive-{}-{}", archive_date.timestamp_millis(), &suffix[..8])
}

/// Outcome of a successful resell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResellReceipt {
    pub item: Item,
    pub refund: i64,
    pub new_balance: i64,
}

impl ResellReceipt {
    pub fn rarity(&self) -> Rarity {
        self.item.rarity.effective()
    }
}

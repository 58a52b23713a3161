use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{deck::Item, telemetry::TelemetrySnapshot};

/// Sessions shorter than this many seconds are Speedy.
pub const SHORT_SESSION_SECS: i64 = 60;

/// Quick flips needed for the NoBrainer badge.
pub const NO_BRAINER_QUICK_FLIPS: u32 = 3;

/// One label summarising how a finished session was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleBadge {
    #[serde(rename = "Speedy")]
    Speedy,
    #[serde(rename = "Brave run")]
    BraveRun,
    #[serde(rename = "No brainer")]
    NoBrainer,
    #[serde(rename = "No player")]
    NoPlayer,
    #[serde(rename = "Curator")]
    Curator,
    #[serde(rename = "Flipper")]
    Flipper,
    #[serde(rename = "Risk-taker")]
    RiskTaker,
}

impl fmt::Display for StyleBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                StyleBadge::Speedy => "Speedy",
                StyleBadge::BraveRun => "Brave run",
                StyleBadge::NoBrainer => "No brainer",
                StyleBadge::NoPlayer => "No player",
                StyleBadge::Curator => "Curator",
                StyleBadge::Flipper => "Flipper",
                StyleBadge::RiskTaker => "Risk-taker",
            }
        )
    }
}

/// Assigns a badge. Rules are checked in a fixed order and the first match
/// wins, so a short session that also sold an S is still Speedy.
pub fn classify(items: &[Item], telemetry: &TelemetrySnapshot) -> StyleBadge {
    if telemetry.session_duration_seconds < SHORT_SESSION_SECS {
        return StyleBadge::Speedy;
    }
    if telemetry.sold_high_rarity {
        return StyleBadge::BraveRun;
    }
    if telemetry.quick_flip_count >= NO_BRAINER_QUICK_FLIPS {
        return StyleBadge::NoBrainer;
    }
    if telemetry.resell_count == 0 {
        return StyleBadge::NoPlayer;
    }

    let owned = items.iter().filter(|i| i.is_owned()).count();
    let resold = items.iter().filter(|i| i.is_resold()).count();

    if owned >= 2 * resold && owned >= 3 {
        StyleBadge::Curator
    } else if resold >= owned && resold >= 2 {
        StyleBadge::Flipper
    } else {
        StyleBadge::RiskTaker
    }
}

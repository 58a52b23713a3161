use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{rarity::Rarity, style::StyleBadge};

/// Behavioural counters for one active session. Owned by the session
/// controller and only changed through the `record_*` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTelemetry {
    rolls: u32,
    tokens_spent: i64,
    resell_count: u32,
    quick_flip_count: u32,
    sold_high_rarity: bool,
    started_at: DateTime<Utc>,
}

impl SessionTelemetry {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            rolls: 0,
            tokens_spent: 0,
            resell_count: 0,
            quick_flip_count: 0,
            sold_high_rarity: false,
            started_at,
        }
    }

    pub fn start_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn record_roll(&mut self, cost: i64) {
        self.rolls += 1;
        self.tokens_spent += cost;
    }

    pub fn record_resell(&mut self, rarity: Rarity, quick: bool) {
        self.resell_count += 1;
        if quick {
            self.quick_flip_count += 1;
        }
        // Sticky once set
        self.sold_high_rarity |= rarity.is_high();
    }

    pub fn rolls(&self) -> u32 {
        self.rolls
    }

    pub fn resell_count(&self) -> u32 {
        self.resell_count
    }

    pub fn quick_flip_count(&self) -> u32 {
        self.quick_flip_count
    }

    pub fn sold_high_rarity(&self) -> bool {
        self.sold_high_rarity
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Score bonus fed to the deck scorer for this session's quick flips.
    pub fn quick_flip_bonus(&self, points_per_flip: i64) -> i64 {
        self.quick_flip_count as i64 * points_per_flip
    }

    /// Freezes the counters, deriving the session length from `now`.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TelemetrySnapshot {
        TelemetrySnapshot {
            rolls: self.rolls,
            tokens_spent: self.tokens_spent,
            resell_count: self.resell_count,
            quick_flip_count: self.quick_flip_count,
            sold_high_rarity: self.sold_high_rarity,
            session_duration_seconds: (now - self.started_at).num_seconds().max(0),
        }
    }
}

/// Telemetry frozen at archival time, before a style badge is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub rolls: u32,
    pub tokens_spent: i64,
    pub resell_count: u32,
    pub quick_flip_count: u32,
    pub sold_high_rarity: bool,
    pub session_duration_seconds: i64,
}

/// Telemetry as stored on an archived game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveTelemetry {
    pub rolls: u32,
    pub tokens_spent: i64,
    pub resell_count: u32,
    pub quick_flip_count: u32,
    pub sold_high_rarity: bool,
    pub session_duration_seconds: i64,
    pub style_badge: StyleBadge,
}

impl ArchiveTelemetry {
    pub fn new(snapshot: TelemetrySnapshot, style_badge: StyleBadge) -> Self {
        Self {
            rolls: snapshot.rolls,
            tokens_spent: snapshot.tokens_spent,
            resell_count: snapshot.resell_count,
            quick_flip_count: snapshot.quick_flip_count,
            sold_high_rarity: snapshot.sold_high_rarity,
            session_duration_seconds: snapshot.session_duration_seconds,
            style_badge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn starts_from_zero() {
        let telemetry = SessionTelemetry::new(start());
        let snapshot = telemetry.snapshot(start());

        assert_eq!(snapshot.rolls, 0);
        assert_eq!(snapshot.tokens_spent, 0);
        assert_eq!(snapshot.resell_count, 0);
        assert!(!snapshot.sold_high_rarity);
        assert_eq!(snapshot.session_duration_seconds, 0);
    }

    #[test]
    fn accumulates_rolls_and_resells() {
        let mut telemetry = SessionTelemetry::new(start());
        telemetry.record_roll(10);
        telemetry.record_roll(10);
        telemetry.record_resell(Rarity::C, true);
        telemetry.record_resell(Rarity::A, false);

        let snapshot = telemetry.snapshot(start() + Duration::seconds(95));
        assert_eq!(snapshot.rolls, 2);
        assert_eq!(snapshot.tokens_spent, 20);
        assert_eq!(snapshot.resell_count, 2);
        assert_eq!(snapshot.quick_flip_count, 1);
        assert!(!snapshot.sold_high_rarity);
        assert_eq!(snapshot.session_duration_seconds, 95);
    }

    #[test]
    fn sold_high_rarity_is_sticky() {
        let mut telemetry = SessionTelemetry::new(start());
        telemetry.record_resell(Rarity::S, false);
        telemetry.record_resell(Rarity::F, false);

        assert!(telemetry.sold_high_rarity());
    }

    #[test]
    fn quick_flip_bonus_scales_with_flips() {
        let mut telemetry = SessionTelemetry::new(start());
        telemetry.record_resell(Rarity::E, true);
        telemetry.record_resell(Rarity::E, true);

        assert_eq!(telemetry.quick_flip_bonus(3), 6);
    }

    #[test]
    fn clock_skew_never_yields_negative_duration() {
        let telemetry = SessionTelemetry::new(start());
        let snapshot = telemetry.snapshot(start() - Duration::seconds(30));
        assert_eq!(snapshot.session_duration_seconds, 0);
    }
}

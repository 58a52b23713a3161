use std::collections::HashSet;

use super::super::{component_priority, ScoreComponent, ScoringInput};
use crate::rarity::SET_BONUS_THRESHOLD;

/// (distinct high tiers owned, bonus), highest threshold first.
pub const SET_BONUS_TIERS: [(usize, i64); 3] = [(8, 20), (5, 10), (3, 5)];

/// Bonus for owning `distinct` different tiers at or above B.
pub fn set_bonus_for(distinct: usize) -> i64 {
    SET_BONUS_TIERS
        .iter()
        .find(|(threshold, _)| distinct >= *threshold)
        .map(|(_, bonus)| *bonus)
        .unwrap_or_default()
}

/// Breadth of the owned deck: many different high tiers at once. Shown
/// in the breakdown only, the v2 total does not include it.
#[derive(Default)]
pub struct SetBonusComponent;

impl SetBonusComponent {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreComponent for SetBonusComponent {
    fn name(&self) -> &'static str {
        "set_bonus"
    }

    fn contribution(&self, input: &ScoringInput) -> f64 {
        let distinct: HashSet<usize> = input
            .items
            .iter()
            .filter(|item| item.is_owned())
            .map(|item| item.rarity.effective())
            .filter(|rarity| *rarity >= SET_BONUS_THRESHOLD)
            .map(|rarity| rarity.rank())
            .collect();

        set_bonus_for(distinct.len()) as f64
    }

    fn priority(&self) -> u32 {
        component_priority::BONUS
    }

    fn counts_toward_total(&self) -> bool {
        false
    }
}

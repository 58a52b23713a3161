use super::super::{component_priority, ScoreComponent, ScoringInput};

/// Fractional per-tier points for resold creatures.
#[derive(Default)]
pub struct ResoldComponent;

impl ResoldComponent {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreComponent for ResoldComponent {
    fn name(&self) -> &'static str {
        "resold"
    }

    fn contribution(&self, input: &ScoringInput) -> f64 {
        input
            .resold()
            .map(|item| item.rarity.resold_score_weight())
            .sum()
    }

    fn priority(&self) -> u32 {
        component_priority::RESOLD
    }
}

/// Passes the caller-supplied quick flip bonus through unchanged.
#[derive(Default)]
pub struct QuickFlipBonusComponent;

impl QuickFlipBonusComponent {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreComponent for QuickFlipBonusComponent {
    fn name(&self) -> &'static str {
        "quick_flip_bonus"
    }

    fn contribution(&self, input: &ScoringInput) -> f64 {
        input.quick_flip_bonus as f64
    }

    fn priority(&self) -> u32 {
        component_priority::BONUS
    }
}

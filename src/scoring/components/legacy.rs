//! The superseded v1 formula. Only used to explain archives tagged "v1";
//! their stored score is never recomputed.

use super::super::{component_priority, ScoreComponent, ScoringInput};

#[derive(Default)]
pub struct LegacyOwnedComponent;

impl LegacyOwnedComponent {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreComponent for LegacyOwnedComponent {
    fn name(&self) -> &'static str {
        "legacy_owned"
    }

    fn contribution(&self, input: &ScoringInput) -> f64 {
        input
            .items
            .iter()
            .filter(|item| item.is_owned())
            .map(|item| item.rarity.effective().legacy_owned_score() as f64)
            .sum()
    }

    fn priority(&self) -> u32 {
        component_priority::OWNED
    }
}

/// One flat point per resold creature regardless of tier.
#[derive(Default)]
pub struct LegacyResoldComponent;

impl LegacyResoldComponent {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreComponent for LegacyResoldComponent {
    fn name(&self) -> &'static str {
        "legacy_resold"
    }

    fn contribution(&self, input: &ScoringInput) -> f64 {
        input.resold().count() as f64
    }

    fn priority(&self) -> u32 {
        component_priority::RESOLD
    }
}

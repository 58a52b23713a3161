use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::{
    components::{
        LegacyOwnedComponent, LegacyResoldComponent, OwnedSliceComponent, QuickFlipBonusComponent,
        ResoldComponent, SetBonusComponent, TokenConversionComponent, OVERFLOW_WEIGHT,
        TOP_OWNED_COUNT,
    },
    ScoreComponent, ScoringInput, ScoringVersion,
};
use crate::deck::Item;

/// Rounds halves upward and never returns a negative score.
pub fn round_half_up(value: f64) -> i64 {
    ((value + 0.5).floor() as i64).max(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScore {
    pub name: &'static str,
    pub value: f64,
    pub counted: bool,
}

/// Unrounded per-component terms plus the single rounded total of the
/// counted ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub version: ScoringVersion,
    pub components: Vec<ComponentScore>,
    pub total: i64,
}

impl ScoreBreakdown {
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }
}

/// Pure deck scorer: a fixed, ordered list of additive components.
pub struct DeckScorer {
    version: ScoringVersion,
    components: Vec<Arc<dyn ScoreComponent>>,
}

impl DeckScorer {
    pub fn builder(version: ScoringVersion) -> DeckScorerBuilder {
        DeckScorerBuilder::new(version)
    }

    pub fn v2() -> Self {
        Self::builder(ScoringVersion::V2).build()
    }

    pub fn v1() -> Self {
        Self::builder(ScoringVersion::V1).build()
    }

    pub fn for_version(version: ScoringVersion) -> Self {
        Self::builder(version).build()
    }

    pub fn version(&self) -> ScoringVersion {
        self.version
    }

    pub fn breakdown(
        &self,
        items: &[Item],
        token_balance: i64,
        quick_flip_bonus: i64,
    ) -> ScoreBreakdown {
        let input = ScoringInput::new(items, token_balance, quick_flip_bonus);

        let components: Vec<ComponentScore> = self
            .components
            .iter()
            .map(|component| ComponentScore {
                name: component.name(),
                value: component.contribution(&input),
                counted: component.counts_toward_total(),
            })
            .collect();

        let raw: f64 = components
            .iter()
            .filter(|c| c.counted)
            .map(|c| c.value)
            .sum();
        let total = round_half_up(raw);

        debug!(
            version = %self.version,
            items = items.len(),
            token_balance,
            quick_flip_bonus,
            raw,
            total,
            "Deck scored"
        );

        ScoreBreakdown {
            version: self.version,
            components,
            total,
        }
    }

    pub fn compute(&self, items: &[Item], token_balance: i64, quick_flip_bonus: i64) -> i64 {
        self.breakdown(items, token_balance, quick_flip_bonus).total
    }
}

/// Scores a deck with the current (v2) formula.
pub fn compute_score(items: &[Item], token_balance: i64, quick_flip_bonus: i64) -> i64 {
    DeckScorer::v2().compute(items, token_balance, quick_flip_bonus)
}

pub struct DeckScorerBuilder {
    version: ScoringVersion,
    components: Vec<Arc<dyn ScoreComponent>>,
}

impl DeckScorerBuilder {
    fn new(version: ScoringVersion) -> Self {
        let components: Vec<Arc<dyn ScoreComponent>> = match version {
            ScoringVersion::V1 => vec![
                Arc::new(LegacyOwnedComponent::new()),
                Arc::new(LegacyResoldComponent::new()),
            ],
            ScoringVersion::V2 => vec![
                Arc::new(OwnedSliceComponent::top(TOP_OWNED_COUNT)),
                Arc::new(OwnedSliceComponent::overflow(TOP_OWNED_COUNT, OVERFLOW_WEIGHT)),
                Arc::new(ResoldComponent::new()),
                Arc::new(TokenConversionComponent::new()),
                Arc::new(SetBonusComponent::new()),
                Arc::new(QuickFlipBonusComponent::new()),
            ],
        };

        Self {
            version,
            components,
        }
    }

    pub fn with_component(mut self, component: Arc<dyn ScoreComponent>) -> Self {
        self.components.push(component);
        self
    }

    pub fn build(mut self) -> DeckScorer {
        self.components.sort_by_key(|c| c.priority());
        DeckScorer {
            version: self.version,
            components: self.components,
        }
    }
}

use async_trait::async_trait;
use chrono::Utc;
use strum::IntoEnumIterator;
use tracing::debug;
use uuid::Uuid;

use super::{CreatureGenerator, GeneratorError};
use crate::{deck::Item, rarity::Rarity};

/// Relative drop weights, F first. Sums to 100.
pub const RARITY_DROP_WEIGHTS: [u32; 8] = [30, 25, 18, 12, 8, 4, 2, 1];

// 1x1 transparent PNG
const PLACEHOLDER_IMAGE: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Picks the tier a roll in `0..sum(RARITY_DROP_WEIGHTS)` lands on.
fn rarity_for_roll(mut roll: u32) -> Rarity {
    for (rarity, weight) in Rarity::iter().zip(RARITY_DROP_WEIGHTS) {
        if roll < weight {
            return rarity;
        }
        roll -= weight;
    }
    Rarity::F
}

fn roll_rarity() -> Rarity {
    let total: u32 = RARITY_DROP_WEIGHTS.iter().sum();
    rarity_for_roll(rand::random_range(0..total))
}

/// Offline generator used when no remote endpoint is configured.
pub struct LocalCreatureGenerator;

impl LocalCreatureGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalCreatureGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CreatureGenerator for LocalCreatureGenerator {
    async fn generate(&self) -> Result<Item, GeneratorError> {
        let rarity = roll_rarity();
        let name = petname::Petnames::default().generate_one(2, "-");
        let item = Item::new_owned(
            Uuid::new_v4().to_string(),
            name,
            rarity,
            PLACEHOLDER_IMAGE,
            Utc::now(),
        );

        debug!(item_id = %item.id, rarity = %rarity, "Creature generated locally");
        Ok(item)
    }
}

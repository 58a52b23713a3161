use super::super::{component_priority, ScoreComponent, ScoringInput};

/// Number of highest-rarity owned creatures scored at full weight.
pub const TOP_OWNED_COUNT: usize = 8;

/// Weight applied to owned creatures past the top slice.
pub const OVERFLOW_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slice {
    Top,
    Overflow,
}

/// Scores either the top slice or the overflow slice of the owned deck.
pub struct OwnedSliceComponent {
    slice: Slice,
    cap: usize,
    weight: f64,
}

impl OwnedSliceComponent {
    pub fn top(cap: usize) -> Self {
        Self {
            slice: Slice::Top,
            cap,
            weight: 1.0,
        }
    }

    pub fn overflow(cap: usize, weight: f64) -> Self {
        Self {
            slice: Slice::Overflow,
            cap,
            weight,
        }
    }
}

impl ScoreComponent for OwnedSliceComponent {
    fn name(&self) -> &'static str {
        match self.slice {
            Slice::Top => "owned_top",
            Slice::Overflow => "owned_overflow",
        }
    }

    fn contribution(&self, input: &ScoringInput) -> f64 {
        let owned = input.owned_by_rarity_desc();
        let split = self.cap.min(owned.len());
        let slice = match self.slice {
            Slice::Top => &owned[..split],
            Slice::Overflow => &owned[split..],
        };

        slice
            .iter()
            .map(|item| item.rarity.owned_score_weight() * self.weight)
            .sum()
    }

    fn priority(&self) -> u32 {
        component_priority::OWNED
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Item;
    use chrono::Utc;

    fn owned(rarity: &str) -> Item {
        Item::new_owned(format!("id-{rarity}"), "m", rarity, "", Utc::now())
    }

    #[test]
    fn top_slice_takes_highest_rarities() {
        let mut items: Vec<Item> = (0..8).map(|_| owned("F")).collect();
        items.push(owned("S+"));

        let input = ScoringInput::new(&items, 0, 0);
        let top = OwnedSliceComponent::top(TOP_OWNED_COUNT).contribution(&input);
        let overflow =
            OwnedSliceComponent::overflow(TOP_OWNED_COUNT, OVERFLOW_WEIGHT).contribution(&input);

        // S+ plus seven F at full weight, one F dampened
        assert_eq!(top, 55.0 + 7.0);
        assert_eq!(overflow, 0.25);
    }

    #[test]
    fn overflow_is_empty_below_cap() {
        let items = vec![owned("A"), owned("B")];
        let input = ScoringInput::new(&items, 0, 0);

        assert_eq!(
            OwnedSliceComponent::overflow(TOP_OWNED_COUNT, OVERFLOW_WEIGHT).contribution(&input),
            0.0
        );
        assert_eq!(
            OwnedSliceComponent::top(TOP_OWNED_COUNT).contribution(&input),
            32.0
        );
    }

    #[test]
    fn ignores_resold_items() {
        let mut sold = owned("S+");
        sold.status = crate::deck::ItemStatus::Resold;
        let items = vec![sold];
        let input = ScoringInput::new(&items, 0, 0);

        assert_eq!(
            OwnedSliceComponent::top(TOP_OWNED_COUNT).contribution(&input),
            0.0
        );
    }
}

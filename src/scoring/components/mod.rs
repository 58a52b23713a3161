mod legacy;
mod owned;
mod resold;
mod set_bonus;
mod tokens;

pub use legacy::{LegacyOwnedComponent, LegacyResoldComponent};
pub use owned::{OwnedSliceComponent, OVERFLOW_WEIGHT, TOP_OWNED_COUNT};
pub use resold::{QuickFlipBonusComponent, ResoldComponent};
pub use set_bonus::{set_bonus_for, SetBonusComponent, SET_BONUS_TIERS};
pub use tokens::{token_score, token_score_exact, TokenConversionComponent};

use super::super::{component_priority, round_half_up, ScoreComponent, ScoringInput};

/// Unrounded token conversion: `0.5·t + 2.5·√t` with negative balances
/// clamped to zero.
pub fn token_score_exact(tokens: i64) -> f64 {
    let t = tokens.max(0) as f64;
    0.5 * t + 2.5 * t.sqrt()
}

/// Score granted for a token balance. Grows ever slower so hoarding
/// currency is worth less than spending it.
pub fn token_score(tokens: i64) -> i64 {
    round_half_up(token_score_exact(tokens))
}

#[derive(Default)]
pub struct TokenConversionComponent;

impl TokenConversionComponent {
    pub fn new() -> Self {
        Self
    }
}

impl ScoreComponent for TokenConversionComponent {
    fn name(&self) -> &'static str {
        "tokens"
    }

    // Rounded on its own before joining the sum; the v2 archives were
    // produced that way.
    fn contribution(&self, input: &ScoringInput) -> f64 {
        token_score(input.token_balance) as f64
    }

    fn priority(&self) -> u32 {
        component_priority::TOKENS
    }
}

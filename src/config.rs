use std::time::Duration;

use chrono::Duration as ChronoDuration;

use crate::store::DEFAULT_STARTING_TOKENS;

const DEFAULT_GENERATION_COST: i64 = 10;
const DEFAULT_QUICK_FLIP_SECS: i64 = 15;
const DEFAULT_QUICK_FLIP_BONUS: i64 = 1;
const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BEARER_TOKEN: &str = "EPSI";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Game balance and collaborator settings
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub generation_cost: i64,
    pub starting_tokens: i64,
    /// A resell this soon after generation counts as a quick flip
    pub quick_flip_window: ChronoDuration,
    pub quick_flip_bonus: i64,
    pub generator_timeout: Duration,
    pub api_base_url: Option<String>,
    pub certify_url: Option<String>,
    pub bearer_token: String,
    pub database_url: Option<String>,
    pub bind_addr: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            generation_cost: DEFAULT_GENERATION_COST,
            starting_tokens: DEFAULT_STARTING_TOKENS,
            quick_flip_window: ChronoDuration::seconds(DEFAULT_QUICK_FLIP_SECS),
            quick_flip_bonus: DEFAULT_QUICK_FLIP_BONUS,
            generator_timeout: Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
            api_base_url: None,
            certify_url: None,
            bearer_token: DEFAULT_BEARER_TOKEN.to_string(),
            database_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl GameConfig {
    /// Reads `MINIDEK_*` variables (and `DATABASE_URL`), falling back to
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<i64>().ok());
        let non_empty = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            generation_cost: parsed("MINIDEK_GENERATION_COST")
                .filter(|cost| *cost > 0)
                .unwrap_or(defaults.generation_cost),
            starting_tokens: parsed("MINIDEK_STARTING_TOKENS")
                .filter(|tokens| *tokens >= 0)
                .unwrap_or(defaults.starting_tokens),
            quick_flip_window: parsed("MINIDEK_QUICK_FLIP_SECS")
                .filter(|secs| *secs >= 0)
                .map(ChronoDuration::seconds)
                .unwrap_or(defaults.quick_flip_window),
            quick_flip_bonus: parsed("MINIDEK_QUICK_FLIP_BONUS")
                .filter(|bonus| *bonus >= 0)
                .unwrap_or(defaults.quick_flip_bonus),
            generator_timeout: parsed("MINIDEK_GENERATOR_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.generator_timeout),
            api_base_url: non_empty("MINIDEK_API_BASE_URL").map(trim_trailing_slashes),
            certify_url: non_empty("MINIDEK_CERTIFY_URL").map(trim_trailing_slashes),
            bearer_token: non_empty("MINIDEK_BEARER_TOKEN").unwrap_or(defaults.bearer_token),
            database_url: non_empty("DATABASE_URL"),
            bind_addr: non_empty("MINIDEK_BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }
}

fn trim_trailing_slashes(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> GameConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GameConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.generation_cost, 10);
        assert_eq!(config.starting_tokens, 100);
        assert_eq!(config.generator_timeout, Duration::from_secs(30));
        assert_eq!(config.bearer_token, "EPSI");
        assert!(config.api_base_url.is_none());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn reads_overrides_and_strips_slashes() {
        let config = config_from(&[
            ("MINIDEK_GENERATION_COST", "25"),
            ("MINIDEK_API_BASE_URL", "https://api.example.test/v1//"),
            ("MINIDEK_BEARER_TOKEN", "  secret "),
            ("MINIDEK_QUICK_FLIP_SECS", "5"),
        ]);
        assert_eq!(config.generation_cost, 25);
        assert_eq!(
            config.api_base_url.as_deref(),
            Some("https://api.example.test/v1")
        );
        assert_eq!(config.bearer_token, "secret");
        assert_eq!(config.quick_flip_window, ChronoDuration::seconds(5));
    }

    #[test]
    fn ignores_invalid_values() {
        let config = config_from(&[
            ("MINIDEK_GENERATION_COST", "-3"),
            ("MINIDEK_STARTING_TOKENS", "lots"),
            ("MINIDEK_API_BASE_URL", "   "),
        ]);
        assert_eq!(config.generation_cost, 10);
        assert_eq!(config.starting_tokens, 100);
        assert!(config.api_base_url.is_none());
    }

    #[test]
    fn rejects_negative_quick_flip_settings() {
        let defaults = GameConfig::default();
        let config = config_from(&[
            ("MINIDEK_QUICK_FLIP_BONUS", "-4"),
            ("MINIDEK_QUICK_FLIP_SECS", "-15"),
        ]);
        assert_eq!(config.quick_flip_bonus, defaults.quick_flip_bonus);
        assert_eq!(config.quick_flip_window, defaults.quick_flip_window);

        let config = config_from(&[("MINIDEK_QUICK_FLIP_BONUS", "0")]);
        assert_eq!(config.quick_flip_bonus, 0);
    }
}

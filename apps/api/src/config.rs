use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::matching::allocator::SelectionPolicy;
use crate::matching::scoring::ScoringPolicy;

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid values abort startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub scoring_policy: ScoringPolicy,
    pub selection_policy: SelectionPolicy,
    /// Employees must stay engaged strictly beyond today + this many days.
    pub lookahead_days: u64,
    pub shortlist_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            port: parse_or(&var, "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            scoring_policy: parse_or(&var, "SCORING_POLICY", ScoringPolicy::Set)?,
            selection_policy: parse_or(&var, "SELECTION_POLICY", SelectionPolicy::Threshold)?,
            lookahead_days: parse_or(&var, "LOOKAHEAD_DAYS", 15)?,
            shortlist_limit: parse_or(&var, "SHORTLIST_LIMIT", 10)?,
        };

        if config.shortlist_limit == 0 {
            return Err(anyhow!("SHORTLIST_LIMIT must be at least 1"));
        }
        Ok(config)
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.scoring_policy, ScoringPolicy::Set);
        assert_eq!(config.selection_policy, SelectionPolicy::Threshold);
        assert_eq!(config.lookahead_days, 15);
        assert_eq!(config.shortlist_limit, 10);
    }

    #[test]
    fn test_policies_read_from_env() {
        let config = config_from(&[
            ("SCORING_POLICY", "substring"),
            ("SELECTION_POLICY", "exact-match-preferred"),
            ("LOOKAHEAD_DAYS", " 30 "),
        ])
        .unwrap();
        assert_eq!(config.scoring_policy, ScoringPolicy::Substring);
        assert_eq!(config.selection_policy, SelectionPolicy::ExactMatchPreferred);
        assert_eq!(config.lookahead_days, 30);
    }

    #[test]
    fn test_invalid_value_names_variable() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(format!("{err:#}").contains("PORT"), "{err:#}");

        let err = config_from(&[("SCORING_POLICY", "fuzzy")]).unwrap_err();
        assert!(format!("{err:#}").contains("unknown scoring policy"), "{err:#}");
    }

    #[test]
    fn test_zero_shortlist_limit_rejected() {
        assert!(config_from(&[("SHORTLIST_LIMIT", "0")]).is_err());
    }
}

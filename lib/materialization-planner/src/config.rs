use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::matching::NameMatcher;

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone, Default)]
pub struct PlannerConfig {
    /// Memoization of the variable-key to domain-argument matching.
    #[serde(default)]
    pub variable_match_cache: VariableMatchCacheConfig,
    /// How external names (columns, variable and raw input keys) are compared
    /// with schema names.
    #[serde(default)]
    pub matching: MatchingConfig,
}

impl PlannerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn name_matcher(&self) -> NameMatcher {
        NameMatcher::new(self.matching.case_insensitive)
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
pub struct VariableMatchCacheConfig {
    /// Maximum number of distinct variable-key sets kept.
    ///
    /// Default: 1000.
    #[serde(default = "default_variable_match_cache_max_capacity")]
    pub max_capacity: u64,
    /// Entries unused for this long are evicted.
    ///
    /// Default: 10m.
    #[serde(
        default = "default_variable_match_cache_time_to_idle",
        deserialize_with = "humantime_serde::deserialize",
        serialize_with = "humantime_serde::serialize"
    )]
    #[schemars(with = "String")]
    pub time_to_idle: Duration,
}

impl Default for VariableMatchCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_variable_match_cache_max_capacity(),
            time_to_idle: default_variable_match_cache_time_to_idle(),
        }
    }
}

fn default_variable_match_cache_max_capacity() -> u64 {
    1000
}

fn default_variable_match_cache_time_to_idle() -> Duration {
    Duration::from_secs(600)
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
pub struct MatchingConfig {
    /// Fall back to case-insensitive comparison when no exact match exists.
    ///
    /// Default: true.
    #[serde(default = "default_matching_case_insensitive")]
    pub case_insensitive: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            case_insensitive: default_matching_case_insensitive(),
        }
    }
}

fn default_matching_case_insensitive() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::PlannerConfig;

    #[test]
    fn missing_sections_use_defaults() -> Result<(), serde_json::Error> {
        let config = PlannerConfig::from_json_str("{}")?;
        assert_eq!(config.variable_match_cache.max_capacity, 1000);
        assert_eq!(
            config.variable_match_cache.time_to_idle,
            Duration::from_secs(600)
        );
        assert!(config.matching.case_insensitive);
        Ok(())
    }

    #[test]
    fn durations_are_human_readable() -> Result<(), serde_json::Error> {
        let config = PlannerConfig::from_json_str(
            r#"{ "variable_match_cache": { "time_to_idle": "30s" }, "matching": { "case_insensitive": false } }"#,
        )?;
        assert_eq!(
            config.variable_match_cache.time_to_idle,
            Duration::from_secs(30)
        );
        assert_eq!(config.variable_match_cache.max_capacity, 1000);
        assert!(!config.matching.case_insensitive);
        Ok(())
    }
}

//! Negotiator configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of snapshot nodes kept for reuse between ticks.
pub const DEFAULT_SNAPSHOT_POOL_CAPACITY: usize = 1024;

/// Tunables for a [`Negotiator`](crate::Negotiator).
///
/// Missing fields fall back to their defaults when deserialized:
///
/// ```
/// use spark_touch::NegotiatorConfig;
///
/// let config = NegotiatorConfig::from_json_str(r#"{ "snapshot_pool_capacity": 64 }"#).unwrap();
/// assert!(config.revalidate_each_tick);
/// assert_eq!(config.snapshot_pool_capacity, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Re-run hit testing for every live touch at the start of each tick,
    /// so geometry that moved without a hardware event still produces
    /// in/out/covered/cancel callbacks.
    pub revalidate_each_tick: bool,

    /// Upper bound on pooled snapshot nodes. Zero disables pooling.
    pub snapshot_pool_capacity: usize,
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            revalidate_each_tick: true,
            snapshot_pool_capacity: DEFAULT_SNAPSHOT_POOL_CAPACITY,
        }
    }
}

impl NegotiatorConfig {
    /// Parse a config from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_pool_capacity > 1 << 24 {
            return Err(ConfigError::Invalid(format!(
                "snapshot_pool_capacity {} is unreasonably large",
                self.snapshot_pool_capacity
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NegotiatorConfig::default();
        assert!(config.revalidate_each_tick);
        assert_eq!(config.snapshot_pool_capacity, DEFAULT_SNAPSHOT_POOL_CAPACITY);
    }

    #[test]
    fn test_from_json_partial() {
        let config = NegotiatorConfig::from_json_str(r#"{ "revalidate_each_tick": false }"#).unwrap();
        assert!(!config.revalidate_each_tick);
        assert_eq!(config.snapshot_pool_capacity, DEFAULT_SNAPSHOT_POOL_CAPACITY);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            NegotiatorConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            NegotiatorConfig::from_json_str(r#"{ "snapshot_pool_capacity": 999999999 }"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}

//! Executor configuration with validation and JSON parsing.

use serde::{Deserialize, Serialize};

/// Construction-time options recognized by both executors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum concurrent in-flight submissions. Bounds the number of
    /// funding handles checked out at once; a refill occupies one slot.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
    /// Fragments minted per refill split.
    #[serde(default = "default_coin_batch_size")]
    pub coin_batch_size: u32,
}

fn default_max_pool_size() -> u32 {
    50
}

fn default_coin_batch_size() -> u32 {
    20
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_pool_size: default_max_pool_size(),
            coin_batch_size: default_coin_batch_size(),
        }
    }
}

impl ExecutorConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pool_size == 0 {
            return Err("max_pool_size must be greater than 0".into());
        }
        if self.coin_batch_size == 0 {
            return Err("coin_batch_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: ExecutorConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ExecutorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_pool_size, 50);
        assert_eq!(cfg.coin_batch_size, 20);
    }

    #[test]
    fn zero_values_rejected() {
        let cfg = ExecutorConfig {
            max_pool_size: 0,
            coin_batch_size: 2,
        };
        assert!(cfg.validate().is_err());

        let cfg = ExecutorConfig {
            max_pool_size: 3,
            coin_batch_size: 0,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_json_with_defaults() {
        let cfg = ExecutorConfig::from_json_str(r#"{"max_pool_size": 8}"#).unwrap();
        assert_eq!(cfg.max_pool_size, 8);
        assert_eq!(cfg.coin_batch_size, 20);

        assert!(ExecutorConfig::from_json_str(r#"{"max_pool_size": 0}"#).is_err());
        assert!(ExecutorConfig::from_json_str("not json").is_err());
    }
}

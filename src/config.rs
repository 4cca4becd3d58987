//! Configuration management for Burstgate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::{BurstgateError, Result};
use crate::ratelimit::Limit;
use crate::throttle::DEFAULT_CHUNK_SIZE;

/// Main configuration for Burstgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurstgateConfig {
    /// Named limit profiles
    #[serde(default)]
    pub limits: HashMap<String, Limit>,

    /// Copy configuration
    #[serde(default)]
    pub copy: CopyConfig,
}

/// Settings for throttled copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Largest chunk gated at once
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Initial balance; defaults to the limit's max_balance
    #[serde(default)]
    pub preload: Option<f64>,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            preload: None,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl CopyConfig {
    /// The initial balance to use under `limit`.
    pub fn preload_for(&self, limit: &Limit) -> f64 {
        self.preload.unwrap_or(limit.max_balance)
    }
}

impl BurstgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BurstgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| BurstgateError::Config(format!("Failed to parse configuration: {}", e)))?;

        for (name, limit) in &config.limits {
            limit.validate().map_err(|e| {
                BurstgateError::Config(format!("Limit profile '{}': {}", name, e))
            })?;
        }
        if config.copy.chunk_size == 0 {
            return Err(BurstgateError::Config("copy.chunk_size must be > 0".to_string()));
        }

        Ok(config)
    }

    /// Look up and validate a named limit profile.
    pub fn limit(&self, name: &str) -> Result<Limit> {
        let limit = self
            .limits
            .get(name)
            .copied()
            .ok_or_else(|| BurstgateError::Config(format!("Unknown limit profile '{}'", name)))?;

        limit.validate().map_err(|e| {
            BurstgateError::Config(format!("Limit profile '{}': {}", name, e))
        })?;
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BurstgateConfig::default();
        assert!(config.limits.is_empty());
        assert_eq!(config.copy.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.copy.preload, None);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
limits:
  peer:
    bytes_per_second: 131072
    max_balance: 262144
    min_balance: -65536
  multicast:
    bytes_per_second: 4096
    max_balance: 8192
copy:
  chunk_size: 1024
  preload: 0
"#;
        let config = BurstgateConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.limits.len(), 2);
        assert_eq!(
            config.limit("peer").unwrap(),
            Limit::new(131072.0, 262144.0, -65536.0)
        );
        assert_eq!(config.limit("multicast").unwrap().min_balance, 0.0);
        assert_eq!(config.copy.chunk_size, 1024);
        assert_eq!(config.copy.preload, Some(0.0));
    }

    #[test]
    fn test_preload_defaults_to_max_balance() {
        let copy = CopyConfig::default();
        let limit = Limit::new(10.0, 500.0, 0.0);
        assert_eq!(copy.preload_for(&limit), 500.0);

        let copy = CopyConfig {
            preload: Some(-5.0),
            ..CopyConfig::default()
        };
        assert_eq!(copy.preload_for(&limit), -5.0);
    }

    #[test]
    fn test_unknown_profile() {
        let config = BurstgateConfig::default();
        assert!(matches!(config.limit("nope"), Err(BurstgateError::Config(_))));
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let yaml = r#"
limits:
  broken:
    bytes_per_second: -1
    max_balance: 100
"#;
        let err = BurstgateConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_limit_validates_profiles_built_in_code() {
        let mut config = BurstgateConfig::default();
        config
            .limits
            .insert("inverted".to_string(), Limit::new(10.0, -100.0, -10.0));
        config
            .limits
            .insert("ok".to_string(), Limit::new(10.0, 100.0, -10.0));

        let err = config.limit("inverted").unwrap_err();
        assert!(matches!(err, BurstgateError::Config(_)));
        assert!(err.to_string().contains("inverted"));
        assert_eq!(config.limit("ok").unwrap(), Limit::new(10.0, 100.0, -10.0));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let yaml = "copy:\n  chunk_size: 0\n";
        assert!(BurstgateConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        assert!(matches!(
            BurstgateConfig::from_yaml("limits: [not, a, map]"),
            Err(BurstgateError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("burstgate-{}.yaml", std::process::id()));
        std::fs::write(&path, "limits:\n  a:\n    bytes_per_second: 1\n    max_balance: 2\n").unwrap();

        let config = BurstgateConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.limit("a").unwrap(), Limit::new(1.0, 2.0, 0.0));
    }
}

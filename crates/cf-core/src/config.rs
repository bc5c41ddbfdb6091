//! Pipeline tunables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Element id prefixes that only ever appear on third-party ad containers.
pub const DEFAULT_KNOWN_AD_ID_PREFIXES: &[&str] = &["google_ads_iframe_", "div-gpt-ad", "adfox_"];

/// Selectors taken from one stage queue per pump.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Delay between two pumps.
pub const DEFAULT_PUMP_INTERVAL_MS: u64 = 50;

/// Entries kept in the domain parse cache.
pub const DEFAULT_DOMAIN_CACHE_CAPACITY: usize = 4096;

/// Tunables for a page session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Maximum selectors joined into one query.
    pub batch_size: usize,
    /// Delay before the next pump once a pump did work.
    pub pump_interval_ms: u64,
    /// Id prefixes that mark a subtree as a known third-party ad.
    pub known_ad_id_prefixes: Vec<String>,
    /// Capacity of the domain parse cache.
    pub domain_cache_capacity: usize,
    /// Class used to hide elements until the engine sends a randomized one.
    pub hide_class_fallback: Option<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pump_interval_ms: DEFAULT_PUMP_INTERVAL_MS,
            known_ad_id_prefixes: DEFAULT_KNOWN_AD_ID_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            domain_cache_capacity: DEFAULT_DOMAIN_CACHE_CAPACITY,
            hide_class_fallback: None,
        }
    }
}

impl FilterConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batchSize must be at least 1"));
        }
        if self.domain_cache_capacity == 0 {
            return Err(ConfigError::Invalid("domainCacheCapacity must be at least 1"));
        }
        if self.known_ad_id_prefixes.iter().any(|prefix| prefix.is_empty()) {
            return Err(ConfigError::Invalid("knownAdIdPrefixes must not contain empty prefixes"));
        }
        if matches!(&self.hide_class_fallback, Some(class) if class.trim().is_empty() || class.contains(char::is_whitespace)) {
            return Err(ConfigError::Invalid("hideClassFallback must be a single class token"));
        }
        Ok(())
    }

    #[inline]
    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FilterConfig::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.pump_interval(), Duration::from_millis(50));
        assert_eq!(config.known_ad_id_prefixes.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = FilterConfig::from_json_str(r#"{"batchSize": 10}"#).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.pump_interval_ms, 50);
        assert_eq!(config.domain_cache_capacity, 4096);
    }

    #[test]
    fn test_rejects_zero_batch() {
        let err = FilterConfig::from_json_str(r#"{"batchSize": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_multi_token_fallback_class() {
        let err = FilterConfig::from_json_str(r#"{"hideClassFallback": "a b"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            FilterConfig::from_json_str("{batch"),
            Err(ConfigError::Parse(_))
        ));
    }
}

use std::io::Read;
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;
use crate::geometry::Geometry;

/// A set of caches to simulate side by side against the same trace
#[derive(Debug, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub caches: Vec<CacheConfig>,
}

impl SimulationConfig {
    /// Parses a JSON configuration and validates every cache in it
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepolicy::config::SimulationConfig;
    /// let json = r#"{ "caches": [ { "name": "small", "block_size": 16, "cache_size": 1024,
    ///                               "associativity": 2, "replacement_policy": "arc" } ] }"#;
    /// let config = SimulationConfig::from_reader(json.as_bytes()).unwrap();
    /// assert_eq!(config.caches[0].geometry().unwrap().num_sets(), 32);
    /// ```
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caches.is_empty() {
            return Err(ConfigError::NoCaches);
        }
        for cache in &self.caches {
            cache.geometry()?;
        }
        Ok(())
    }
}

/// A configuration for a single cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub name: String,
    pub block_size: u64,
    pub cache_size: u64,
    pub associativity: u64,
    #[serde(default)]
    pub replacement_policy: ReplacementPolicyConfig,
}

impl CacheConfig {
    /// Validates the shape of the cache, see [`Geometry::new`]
    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        Geometry::new(self.block_size, self.cache_size, self.associativity)
    }
}

/// The replacement policy - lru, lfu, or arc. Defaults to lru.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Deserialize, Serialize)]
pub enum ReplacementPolicyConfig {
    #[default]
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "lfu")]
    LeastFrequentlyUsed,
    #[serde(alias = "arc")]
    AdaptiveReplacement,
}

//! Configuration surface for the coordinator and the demo binary.
//!
//! The hard part (`Coordinator`) only ever consumes a `tag`, a store handle,
//! and per-call `ttl`/`compute`. This module exists for the ambient concern
//! of getting those values from somewhere, mirroring the Go original's YAML
//! config file and its environment-variable proxy override, without
//! resurrecting the gRPC server or CLI fan-out client that also lived
//! alongside them.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_lock_ttl_secs() -> u64 {
    5
}

fn default_value_ttl_secs() -> u64 {
    60
}

/// Coordinator configuration, deserializable from the YAML file the demo
/// binary reads (`config.yml` in the Go original), with `redis_url`
/// overridable by the `MEMOLOCK_REDIS_URL` environment variable the way the
/// Go original overrides its HTTP proxy via `envconfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Namespace prefix for all keys and channels.
    pub tag: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Default lock TTL (compute-duration bound) for callers that don't
    /// pick their own.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    /// Default value TTL (cache-freshness bound) for callers whose compute
    /// doesn't return its own.
    #[serde(default = "default_value_ttl_secs")]
    pub value_ttl_secs: u64,
}

const REDIS_URL_ENV: &str = "MEMOLOCK_REDIS_URL";

impl CoordinatorConfig {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| crate::error::Error::InvalidConfig(err.to_string()))?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string and applies environment
    /// overrides. Split out from `from_yaml_file` so tests don't need a
    /// filesystem.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)
            .map_err(|err| crate::error::Error::InvalidConfig(err.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var(REDIS_URL_ENV) {
            self.redis_url = url;
        }
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn value_ttl(&self) -> Duration {
        Duration::from_secs(self.value_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_fields() {
        let config = CoordinatorConfig::from_yaml_str("tag: query\n").unwrap();
        assert_eq!(config.tag, "query");
        assert_eq!(config.redis_url, default_redis_url());
        assert_eq!(config.lock_ttl(), Duration::from_secs(5));
        assert_eq!(config.value_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let yaml = "tag: query\nredis_url: redis://cache:6379\nlock_ttl_secs: 3\nvalue_ttl_secs: 30\n";
        let config = CoordinatorConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.redis_url, "redis://cache:6379");
        assert_eq!(config.lock_ttl(), Duration::from_secs(3));
        assert_eq!(config.value_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn env_override_wins_over_yaml() {
        let yaml = "tag: query\nredis_url: redis://cache:6379\n";
        // SAFETY: test-only, no other thread in this process touches this var.
        unsafe {
            env::set_var(REDIS_URL_ENV, "redis://override:6379");
        }
        let config = CoordinatorConfig::from_yaml_str(yaml).unwrap();
        unsafe {
            env::remove_var(REDIS_URL_ENV);
        }
        assert_eq!(config.redis_url, "redis://override:6379");
    }
}

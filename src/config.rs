//! Configuration management for Tollgate.
//!
//! Settings are read once at startup from an optional YAML file and then
//! from `TOLLGATE_`-prefixed environment variables, with `__` separating
//! nested keys (`TOLLGATE_RATE_LIMITING__REDIS_URL=redis://...`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TollgateError};
use crate::ratelimit::DEFAULT_SWEEP_INTERVAL;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address for the admission service
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Redis connection URL. When absent the in-process store is used.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix for every Redis key written by the distributed store
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    /// Upper bound for a single Redis round trip in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub redis_timeout_ms: u64,

    /// How often the local store evicts expired windows, in seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            redis_key_prefix: default_redis_key_prefix(),
            redis_timeout_ms: default_redis_timeout_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_redis_key_prefix() -> String {
    "tollgate".to_string()
}

fn default_redis_timeout_ms() -> u64 {
    250
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

impl RateLimitingConfig {
    /// Whether a shared backend has been configured.
    pub fn is_distributed(&self) -> bool {
        self.redis_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(TollgateError::Config(
                "sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.redis_timeout_ms == 0 {
            return Err(TollgateError::Config(
                "redis_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.redis_key_prefix.is_empty() || self.redis_key_prefix.contains(':') {
            return Err(TollgateError::Config(format!(
                "redis_key_prefix must be non-empty and free of ':', got {:?}",
                self.redis_key_prefix
            )));
        }
        Ok(())
    }
}

impl TollgateConfig {
    /// Load configuration from an optional file layered under the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: TollgateConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.rate_limiting.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TollgateConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TollgateError::Config(e.to_string()))?;
        config.rate_limiting.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_local_store() {
        let config = TollgateConfig::default();
        assert!(!config.rate_limiting.is_distributed());
        assert_eq!(config.rate_limiting.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.server.listen_addr.port(), 8081);
    }

    #[test]
    fn test_from_yaml_with_redis() {
        let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
rate_limiting:
  redis_url: "redis://127.0.0.1:6379/"
  redis_timeout_ms: 100
"#;
        let config = TollgateConfig::from_yaml(yaml).unwrap();
        assert!(config.rate_limiting.is_distributed());
        assert_eq!(config.rate_limiting.redis_timeout(), Duration::from_millis(100));
        assert_eq!(config.rate_limiting.redis_key_prefix, "tollgate");
        assert_eq!(config.server.listen_addr.port(), 9000);
    }

    #[test]
    fn test_blank_redis_url_is_not_distributed() {
        let yaml = r#"
rate_limiting:
  redis_url: "  "
"#;
        let config = TollgateConfig::from_yaml(yaml).unwrap();
        assert!(!config.rate_limiting.is_distributed());
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let yaml = r#"
rate_limiting:
  sweep_interval_secs: 0
"#;
        let err = TollgateConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, TollgateError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("tollgate-config-{}.yaml", std::process::id()));
        std::fs::write(
            &path,
            "rate_limiting:\n  sweep_interval_secs: 30\n  redis_key_prefix: staging\n",
        )
        .unwrap();

        let config = TollgateConfig::load(Some(path.as_path())).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.rate_limiting.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.rate_limiting.redis_key_prefix, "staging");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let path = std::env::temp_dir().join("tollgate-does-not-exist.yaml");
        assert!(matches!(
            TollgateConfig::load(Some(path.as_path())),
            Err(TollgateError::Config(_))
        ));
    }

    #[test]
    fn test_prefix_with_colon_rejected() {
        let yaml = r#"
rate_limiting:
  redis_key_prefix: "a:b"
"#;
        assert!(TollgateConfig::from_yaml(yaml).is_err());
    }
}

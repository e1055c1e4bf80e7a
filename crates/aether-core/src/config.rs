//! Configuration for the fetch, cache, and politeness machinery.
//!
//! One flat [`Config`] struct covers every tunable: HTTP identity and
//! timeouts, concurrency caps, cache tiers, and the robots override list.
//! Defaults are deliberately conservative (4-way concurrency, 30 second
//! cache TTL) so an unconfigured toolkit is a polite one.
//!
//! ```rust
//! use aether_core::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.max_concurrent_hosts, 4);
//! assert!(config.enable_memory_cache);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_user_agent() -> String {
    concat!("aether/", env!("CARGO_PKG_VERSION"), " (+https://github.com/aether-dev/aether)")
        .to_string()
}

const fn default_request_timeout_secs() -> u64 {
    15
}

const fn default_max_concurrent_hosts() -> usize {
    4
}

const fn default_max_requests_per_host() -> usize {
    4
}

const fn default_cache_ttl_secs() -> u64 {
    30
}

const fn default_max_cache_entries() -> usize {
    128
}

const fn default_true() -> bool {
    true
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from(".aether-cache")
}

/// Toolkit-wide settings.
///
/// Loadable from TOML; every field has a serde default so partial files
/// work. `AETHER_CACHE_DIR` overrides the file-tier directory regardless of
/// what the file says.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `User-Agent` forced onto every outbound request, robots fetches
    /// included.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request upper bound, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Global cap on distinct in-flight requests.
    #[serde(default = "default_max_concurrent_hosts")]
    pub max_concurrent_hosts: usize,

    /// Cap on in-flight requests to any single host.
    #[serde(default = "default_max_requests_per_host")]
    pub max_requests_per_host: usize,

    /// Default TTL applied to cache writes, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Memory-tier LRU capacity.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,

    /// Whether the in-memory LRU tier participates.
    #[serde(default = "default_true")]
    pub enable_memory_cache: bool,

    /// Whether the on-disk tier participates.
    #[serde(default = "default_true")]
    pub enable_file_cache: bool,

    /// Whether the remote key-value tier participates.
    #[serde(default)]
    pub enable_redis_cache: bool,

    /// Base directory for the file tier.
    #[serde(default = "default_cache_directory")]
    pub cache_directory: PathBuf,

    /// Remote key-value endpoint, e.g. `redis://127.0.0.1:6379`.
    #[serde(default)]
    pub redis_address: String,

    /// When true, hosts listed in `robots_allowed_hosts` skip the robots
    /// check entirely. Off by default.
    #[serde(default)]
    pub robots_override_enabled: bool,

    /// Hosts exempted from robots checks when the override is enabled.
    #[serde(default)]
    pub robots_allowed_hosts: Vec<String>,

    /// Minimum delay between requests to the same host, in milliseconds.
    /// Zero disables pacing.
    #[serde(default)]
    pub fetch_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_hosts: default_max_concurrent_hosts(),
            max_requests_per_host: default_max_requests_per_host(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_cache_entries: default_max_cache_entries(),
            enable_memory_cache: true,
            enable_file_cache: true,
            enable_redis_cache: false,
            cache_directory: default_cache_directory(),
            redis_address: String::new(),
            robots_override_enabled: false,
            robots_allowed_hosts: Vec::new(),
            fetch_delay_ms: 0,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, then applies environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;
        config.apply_env();
        Ok(config)
    }

    /// Applies environment-variable overrides onto this configuration.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("AETHER_CACHE_DIR") {
            let trimmed = dir.trim();
            if !trimmed.is_empty() {
                self.cache_directory = PathBuf::from(trimmed);
            }
        }
    }

    /// The per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The default cache TTL as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// The per-host pacing delay as a [`Duration`].
    #[must_use]
    pub const fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    /// Rejects configurations that cannot produce a working engine.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("user_agent must not be empty".into()));
        }
        if self.max_concurrent_hosts == 0 {
            return Err(Error::Config("max_concurrent_hosts must be at least 1".into()));
        }
        if self.max_requests_per_host == 0 {
            return Err(Error::Config("max_requests_per_host must be at least 1".into()));
        }
        if self.max_cache_entries == 0 && self.enable_memory_cache {
            return Err(Error::Config(
                "max_cache_entries must be at least 1 when the memory cache is enabled".into(),
            ));
        }
        if self.enable_redis_cache && self.redis_address.trim().is_empty() {
            return Err(Error::Config(
                "redis_address is required when enable_redis_cache is set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.max_concurrent_hosts, 4);
        assert_eq!(config.max_requests_per_host, 4);
        assert_eq!(config.cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.max_cache_entries, 128);
        assert!(config.enable_memory_cache);
        assert!(config.enable_file_cache);
        assert!(!config.enable_redis_cache);
        assert!(!config.robots_override_enabled);
        assert_eq!(config.fetch_delay(), Duration::ZERO);
        assert!(config.user_agent.starts_with("aether/"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            user_agent = "test-agent/1.0"
            max_concurrent_hosts = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.max_concurrent_hosts, 2);
        // Everything else takes the default.
        assert_eq!(config.max_requests_per_host, 4);
        assert_eq!(config.cache_ttl_secs, 30);
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let config = Config {
            max_concurrent_hosts: 0,
            ..Config::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), "config");
    }

    #[test]
    fn validate_requires_redis_address_when_enabled() {
        let config = Config {
            enable_redis_cache: true,
            redis_address: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            enable_redis_cache: true,
            redis_address: "redis://127.0.0.1:6379".into(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_missing_file_is_config_error() {
        let err = Config::load_from(Path::new("/nonexistent/aether.toml")).unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}

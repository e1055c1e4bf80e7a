//! Layered read-through cache over memory, file, and remote tiers.
//!
//! Lookups check the memory tier, then the file tier, then the remote
//! key-value tier, promoting any lower-tier hit into memory with a one-hour
//! TTL. Writes fan out to every enabled tier; a failure in one tier never
//! blocks the others. The whole structure is fail-open: a cache problem
//! degrades performance, never correctness.

mod file;
mod memory;
mod redis;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use redis::RedisCache;

use crate::Config;
use std::time::Duration;
use tracing::debug;

/// TTL applied when promoting a lower-tier hit into the memory tier.
const PROMOTE_TTL: Duration = Duration::from_secs(60 * 60);

/// Composite cache; disabled tiers are simply absent.
pub struct LayeredCache {
    memory: Option<MemoryCache>,
    file: Option<FileCache>,
    remote: Option<RedisCache>,
}

impl LayeredCache {
    /// Assembles tiers according to the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let memory = config
            .enable_memory_cache
            .then(|| MemoryCache::new(config.max_cache_entries));
        let file = if config.enable_file_cache {
            FileCache::new(&config.cache_directory, config.cache_ttl())
        } else {
            None
        };
        let remote = if config.enable_redis_cache {
            RedisCache::new(&config.redis_address)
        } else {
            None
        };
        Self {
            memory,
            file,
            remote,
        }
    }

    /// Builds a cache from explicit tiers.
    #[must_use]
    pub const fn new(
        memory: Option<MemoryCache>,
        file: Option<FileCache>,
        remote: Option<RedisCache>,
    ) -> Self {
        Self {
            memory,
            file,
            remote,
        }
    }

    /// True when at least one tier is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.memory.is_some() || self.file.is_some() || self.remote.is_some()
    }

    /// Read-through lookup with promotion into the memory tier.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(memory) = &self.memory {
            if let Some(bytes) = memory.get(key) {
                debug!(key, tier = "memory", "cache hit");
                return Some(bytes);
            }
        }

        if let Some(file) = &self.file {
            if let Some(bytes) = file.get(key) {
                debug!(key, tier = "file", "cache hit");
                self.promote(key, &bytes);
                return Some(bytes);
            }
        }

        if let Some(remote) = &self.remote {
            if let Some(bytes) = remote.get(key).await {
                debug!(key, tier = "remote", "cache hit");
                self.promote(key, &bytes);
                return Some(bytes);
            }
        }

        None
    }

    /// Writes to every enabled tier.
    pub async fn set(&self, key: &str, bytes: &[u8], ttl: Duration) {
        if let Some(memory) = &self.memory {
            memory.set(key, bytes, ttl);
        }
        if let Some(file) = &self.file {
            file.set(key, bytes);
        }
        if let Some(remote) = &self.remote {
            remote.set(key, bytes, ttl).await;
        }
    }

    /// Drops a key from the memory tier only. Used by tests and by callers
    /// that want to force a lower-tier read.
    pub fn evict_memory(&self, key: &str) {
        if let Some(memory) = &self.memory {
            memory.remove(key);
        }
    }

    fn promote(&self, key: &str, bytes: &[u8]) {
        if let Some(memory) = &self.memory {
            memory.set(key, bytes, PROMOTE_TTL);
        }
    }
}

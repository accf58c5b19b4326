/// Device cache layer
///
/// The client never owns the storage technology. Any key/value store with
/// expiration can sit behind [`DeviceCache`]; the [`CacheGateway`] adds the
/// fixed key-derivation rule and turns every cache failure into a miss.
///
/// Keys are `device:UA` where `UA` is the User-Agent string with all `:`
/// and whitespace characters replaced by `_`, to play nice with Redis keys.

pub mod memory;
pub mod redis_cache;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

use crate::{error::CacheResult, metrics, profile::DeviceProfile};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Prefix of every device cache key
pub const KEY_PREFIX: &str = "device:";

/// Storage backend for resolved profiles
#[async_trait]
pub trait DeviceCache: Send + Sync {
    /// Fetch a profile; `Ok(None)` on miss
    async fn get(&self, key: &str) -> CacheResult<Option<DeviceProfile>>;

    /// Store a profile for `ttl_secs` seconds
    async fn set(&self, key: &str, profile: &DeviceProfile, ttl_secs: u64) -> CacheResult<()>;
}

/// Derive the cache key for a User-Agent
pub fn cache_key(user_agent: &str) -> String {
    let sanitized: String = user_agent
        .chars()
        .map(|c| if c == ':' || c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{}{}", KEY_PREFIX, sanitized)
}

/// Cache-aside wrapper around an optional [`DeviceCache`]
#[derive(Clone, Default)]
pub struct CacheGateway {
    cache: Option<Arc<dyn DeviceCache>>,
}

impl CacheGateway {
    pub fn new(cache: Option<Arc<dyn DeviceCache>>) -> Self {
        Self { cache }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Look up a cached profile. Backend errors count as a miss.
    pub async fn lookup(&self, user_agent: &str) -> Option<DeviceProfile> {
        let cache = self.cache.as_ref()?;
        let key = cache_key(user_agent);

        match cache.get(&key).await {
            Ok(Some(profile)) => {
                debug!("Cache HIT: {}", key);
                metrics::record_cache_access("hit");
                Some(profile)
            }
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                metrics::record_cache_access("miss");
                None
            }
            Err(e) => {
                warn!("Cache GET failed for {}, treating as miss: {}", key, e);
                metrics::record_cache_access("error");
                None
            }
        }
    }

    /// Store a profile in the background. Failures are logged and dropped.
    ///
    /// The write runs on its own task so a slow backend never holds up the
    /// caller. A TTL of zero disables writes. Returns the write task, if one
    /// was started.
    pub fn store(
        &self,
        user_agent: &str,
        profile: &DeviceProfile,
        ttl_secs: u64,
    ) -> Option<JoinHandle<()>> {
        let cache = Arc::clone(self.cache.as_ref()?);
        let key = cache_key(user_agent);

        if ttl_secs == 0 {
            debug!("Cache SET skipped for {}: TTL is 0", key);
            return None;
        }

        let profile = profile.clone();
        debug!("Cache SET: {} (TTL: {}s)", key, ttl_secs);

        Some(tokio::spawn(async move {
            if let Err(e) = cache.set(&key, &profile, ttl_secs).await {
                warn!("Cache SET failed for {}: {}", key, e);
                metrics::record_cache_write_failure();
            }
        }))
    }
}

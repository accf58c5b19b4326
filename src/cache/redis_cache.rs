/// Redis-backed device cache
///
/// Profiles are stored as JSON strings with `SET EX`, so expiry is
/// enforced by Redis itself.
use super::DeviceCache;
use crate::{
    config::CacheConfig,
    error::{CacheError, CacheResult},
    profile::DeviceProfile,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, error, info, warn};

/// Redis cache client
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connect using the cache section of the configuration
    pub async fn connect(config: &CacheConfig) -> CacheResult<Self> {
        info!("Connecting to Redis at {}", config.redis_url);

        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            CacheError::Redis(e)
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            CacheError::Redis(e)
        })?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn build_key(&self, key: &str) -> String {
        prefixed_key(&self.key_prefix, key)
    }

    /// Delete a cached profile
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let cache_key = self.build_key(key);
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(&cache_key).await.map_err(|e| {
            warn!("Redis DELETE failed for {}: {}", cache_key, e);
            CacheError::Redis(e)
        })
    }

    /// Ping Redis to check connection
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;

        if pong != "PONG" {
            return Err(CacheError::Backend(format!(
                "Unexpected Redis PING response: {}",
                pong
            )));
        }

        Ok(())
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

/// Decode a stored entry; `None` means the entry is corrupt and should go
fn decode_entry(cache_key: &str, json: &str) -> Option<DeviceProfile> {
    match serde_json::from_str(json) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!("Failed to deserialize cached profile {}: {}", cache_key, e);
            None
        }
    }
}

#[async_trait]
impl DeviceCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<DeviceProfile>> {
        let cache_key = self.build_key(key);

        let mut conn = self.connection.clone();
        let result: Option<String> = conn.get(&cache_key).await.map_err(|e| {
            warn!("Redis GET failed for {}: {}", cache_key, e);
            CacheError::Redis(e)
        })?;

        let Some(json) = result else {
            return Ok(None);
        };

        match decode_entry(&cache_key, &json) {
            Some(profile) => Ok(Some(profile)),
            None => {
                // Delete corrupted cache entry
                let _ = self.delete(key).await;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, profile: &DeviceProfile, ttl_secs: u64) -> CacheResult<()> {
        let cache_key = self.build_key(key);
        let json = serde_json::to_string(profile)?;

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(&cache_key, json, ttl_secs)
            .await
            .map_err(|e| {
                warn!("Redis SET failed for {}: {}", cache_key, e);
                CacheError::Redis(e)
            })?;

        debug!("Redis SET successful: {}", cache_key);
        Ok(())
    }
}

/// In-process device cache with per-entry expiry
use super::DeviceCache;
use crate::{error::CacheResult, profile::DeviceProfile};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedProfile {
    profile: DeviceProfile,
    expires_at: DateTime<Utc>,
}

/// HashMap-backed cache for single-process deployments and tests
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedProfile>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Memory cache dropped {} expired entries", removed);
        }
        removed
    }
}

#[async_trait]
impl DeviceCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<DeviceProfile>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Utc::now() => {
                    return Ok(Some(entry.profile.clone()));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired, delete it
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, profile: &DeviceProfile, ttl_secs: u64) -> CacheResult<()> {
        let expires_at = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.entries.write().await.insert(
            key.to_string(),
            CachedProfile {
                profile: profile.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}

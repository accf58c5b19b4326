/// Device client - orchestrates cache lookup and remote resolution
use crate::{
    cache::{CacheGateway, DeviceCache},
    config::{ClientConfig, ConfigOptions},
    error::{ConfigError, DetectionError, DetectionResult},
    headers::{prepare_headers, InboundRequest},
    metrics,
    profile::DeviceProfile,
    resolver::RemoteResolver,
};
use axum::http::HeaderMap;
use std::{future::Future, sync::Arc};
use tokio::sync::RwLock;
use tracing::info;

/// WURFL Cloud device detection client
///
/// Cheap to share behind an `Arc`. Each call snapshots the active
/// configuration when it starts, so a `configure` racing an in-flight
/// detection only affects later calls.
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use wurfl_cloud_client::{cache::MemoryCache, ConfigOptions, DeviceClient};
///
/// let client = DeviceClient::new()?.with_cache(Arc::new(MemoryCache::new()));
/// client.configure(ConfigOptions::default().api_key("foobar:1234567890")).await;
///
/// let profile = client.detect_device("Mozilla/5.0 (iPhone)", None).await?;
/// println!("{:?}", profile.capability("is_wireless_device"));
/// # Ok(())
/// # }
/// ```
pub struct DeviceClient {
    config: RwLock<Option<Arc<ClientConfig>>>,
    cache: CacheGateway,
    resolver: RemoteResolver,
}

impl DeviceClient {
    /// Create an unconfigured client without a cache.
    ///
    /// The default configuration is applied lazily on the first detection
    /// unless `configure` is called before.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            config: RwLock::new(None),
            cache: CacheGateway::default(),
            resolver: RemoteResolver::new()?,
        })
    }

    /// Create a client with an explicit configuration
    pub fn with_config(config: ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            config: RwLock::new(Some(Arc::new(config))),
            cache: CacheGateway::default(),
            resolver: RemoteResolver::new()?,
        })
    }

    /// Attach the cache used to store detection results
    pub fn with_cache(mut self, cache: Arc<dyn DeviceCache>) -> Self {
        self.cache = CacheGateway::new(Some(cache));
        self
    }

    /// Replace the configuration with `options` merged over the defaults
    pub async fn configure(&self, options: ConfigOptions) -> Arc<ClientConfig> {
        let config = Arc::new(ClientConfig::from_options(options));
        info!("WURFL Cloud client configured for host {}", config.host);
        *self.config.write().await = Some(config.clone());
        config
    }

    /// The current configuration, `None` until configured or first used
    pub async fn config(&self) -> Option<Arc<ClientConfig>> {
        self.config.read().await.clone()
    }

    async fn active_config(&self) -> Arc<ClientConfig> {
        if let Some(config) = self.config.read().await.as_ref() {
            return config.clone();
        }

        let mut slot = self.config.write().await;
        slot.get_or_insert_with(|| Arc::new(ClientConfig::default()))
            .clone()
    }

    /// Detect a device by User-Agent
    ///
    /// `extra_headers` are sent along with the lookup request; they cannot
    /// replace `User-Agent` or `X-Cloud-Client`.
    pub async fn detect_device(
        &self,
        user_agent: &str,
        extra_headers: Option<&HeaderMap>,
    ) -> DetectionResult<DeviceProfile> {
        self.resolve(user_agent, None, extra_headers).await
    }

    /// Detect the device behind an inbound HTTP request
    ///
    /// Uses the request's `User-Agent` and forwards its device-related
    /// headers and client address. Everything needed is copied out of the
    /// request before the returned future starts, so the request does not
    /// have to outlive the detection.
    pub fn detect_request<'a, R>(
        &'a self,
        request: &R,
        extra_headers: Option<&'a HeaderMap>,
    ) -> impl Future<Output = DetectionResult<DeviceProfile>> + Send + 'a
    where
        R: InboundRequest + ?Sized,
    {
        let user_agent = request.user_agent().unwrap_or_default().to_string();
        let forwarded = prepare_headers(request);
        self.resolve_forwarded(user_agent, forwarded, extra_headers)
    }

    async fn resolve_forwarded(
        &self,
        user_agent: String,
        forwarded: HeaderMap,
        extra_headers: Option<&HeaderMap>,
    ) -> DetectionResult<DeviceProfile> {
        self.resolve(&user_agent, Some(&forwarded), extra_headers)
            .await
    }

    async fn resolve(
        &self,
        user_agent: &str,
        forwarded: Option<&HeaderMap>,
        extra_headers: Option<&HeaderMap>,
    ) -> DetectionResult<DeviceProfile> {
        if user_agent.is_empty() {
            metrics::record_detection(DetectionError::MissingUserAgent.kind());
            return Err(DetectionError::MissingUserAgent);
        }

        let config = self.active_config().await;

        if let Some(profile) = self.cache.lookup(user_agent).await {
            metrics::record_detection("cache_hit");
            return Ok(profile);
        }

        let result = self
            .resolver
            .fetch(&config, user_agent, forwarded, extra_headers, &self.cache)
            .await;

        match &result {
            Ok(_) => metrics::record_detection("fetched"),
            Err(e) => metrics::record_detection(e.kind()),
        }

        result
    }
}

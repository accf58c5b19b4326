/// Configuration management for the WURFL Cloud client
use crate::error::{ConfigError, ServerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::time::Duration;

/// Default WURFL Cloud API host
pub const DEFAULT_HOST: &str = "api.wurflcloud.com";

/// Milliseconds to wait for the server to respond
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// 30 days
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 24 * 3600;

/// Basic auth credentials for the WURFL Cloud API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Split a combined `username:password` API key on its first colon.
    ///
    /// A key without a colon is all username with an empty password.
    pub fn from_api_key(api_key: &str) -> Self {
        let (username, password) = api_key.split_once(':').unwrap_or((api_key, ""));
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Active client configuration
///
/// Built from [`ConfigOptions`] merged over the hard defaults. A new
/// `configure` call replaces it entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host of the WURFL Cloud API, optionally with a port
    pub host: String,
    /// Raw combined API key, kept as supplied
    pub api_key: String,
    pub credentials: Option<Credentials>,
    /// Default capability filter
    pub capabilities: BTreeSet<String>,
    pub timeout_ms: u64,
    pub cache_ttl_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: String::new(),
            credentials: None,
            capabilities: BTreeSet::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ClientConfig {
    /// Merge options over the defaults
    ///
    /// An API key can be either sent as `api_key` in `username:password`
    /// format or as individual `username` and `password` options. When both
    /// are present the API key wins.
    pub fn from_options(options: ConfigOptions) -> Self {
        let defaults = Self::default();

        let api_key = options.api_key.unwrap_or(defaults.api_key);
        let credentials = if !api_key.is_empty() {
            Some(Credentials::from_api_key(&api_key))
        } else if options.username.is_some() || options.password.is_some() {
            Some(Credentials {
                username: options.username.unwrap_or_default(),
                password: options.password.unwrap_or_default(),
            })
        } else {
            defaults.credentials
        };

        Self {
            host: options.host.unwrap_or(defaults.host),
            api_key,
            credentials,
            capabilities: options.capabilities.unwrap_or(defaults.capabilities),
            timeout_ms: options.timeout_ms.unwrap_or(defaults.timeout_ms),
            cache_ttl_secs: options.cache_ttl_secs.unwrap_or(defaults.cache_ttl_secs),
        }
    }

    /// URI of the device lookup endpoint
    pub fn endpoint(&self) -> String {
        format!("http://{}/v1/json/", self.host)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Options accepted by `configure`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOptions {
    pub host: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub capabilities: Option<BTreeSet<String>>,
    pub timeout_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
}

impl ConfigOptions {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn cache_ttl_secs(mut self, ttl: u64) -> Self {
        self.cache_ttl_secs = Some(ttl);
        self
    }

    /// Load options from `WURFL_CLOUD_*` environment variables
    ///
    /// Unset variables stay `None` so the defaults apply.
    pub fn from_env() -> Result<Self, ConfigError> {
        let capabilities = env::var("WURFL_CLOUD_CAPABILITIES").ok().map(|list| {
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<BTreeSet<String>>()
        });

        Ok(Self {
            host: env::var("WURFL_CLOUD_HOST").ok(),
            api_key: env::var("WURFL_CLOUD_API_KEY").ok(),
            username: env::var("WURFL_CLOUD_USERNAME").ok(),
            password: env::var("WURFL_CLOUD_PASSWORD").ok(),
            capabilities,
            timeout_ms: parse_var("WURFL_CLOUD_TIMEOUT_MS")?,
            cache_ttl_secs: parse_var("WURFL_CLOUD_CACHE_TTL")?,
        })
    }
}

/// Which cache store backs the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Always fetch from the API
    None,
    Memory,
    Redis,
}

/// Cache store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub redis_url: String,

    /// Prefix prepended to every Redis key
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: String::new(),
        }
    }
}

impl CacheConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match env::var("CACHE_BACKEND") {
            Ok(value) => parse_backend(&value)?,
            Err(_) => defaults.backend,
        };

        Ok(Self {
            backend,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        })
    }
}

fn parse_backend(value: &str) -> Result<CacheBackend, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" | "off" | "" => Ok(CacheBackend::None),
        "memory" => Ok(CacheBackend::Memory),
        "redis" => Ok(CacheBackend::Redis),
        other => Err(ConfigError::UnknownCacheBackend(other.to_string())),
    }
}

/// Demo server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    pub client: ConfigOptions,
    pub cache: CacheConfig,
}

impl ServerConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ServerError> {
        dotenv::dotenv().ok();

        let hostname = env::var("DEMO_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("DEMO_PORT")?.unwrap_or(3000);

        Ok(Self {
            hostname,
            port,
            client: ConfigOptions::from_env()?,
            cache: CacheConfig::from_env()?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "api.wurflcloud.com");
        assert_eq!(config.api_key, "");
        assert_eq!(config.credentials, None);
        assert!(config.capabilities.is_empty());
        assert_eq!(config.timeout_ms, 2000);
        assert_eq!(config.cache_ttl_secs, 2_592_000);
    }

    #[test]
    fn test_override_host_only() {
        let config = ClientConfig::from_options(ConfigOptions::default().host("foobar.com"));
        assert_eq!(
            config,
            ClientConfig {
                host: "foobar.com".to_string(),
                ..ClientConfig::default()
            }
        );
    }

    #[test]
    fn test_split_api_key() {
        let config = ClientConfig::from_options(ConfigOptions::default().api_key("abc:123"));
        assert_eq!(config.api_key, "abc:123");
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "abc");
        assert_eq!(credentials.password, "123");
    }

    #[test]
    fn test_api_key_splits_on_first_colon() {
        let credentials = Credentials::from_api_key("user:pa:ss");
        assert_eq!(credentials.username, "user");
        assert_eq!(credentials.password, "pa:ss");
    }

    #[test]
    fn test_api_key_without_colon() {
        let credentials = Credentials::from_api_key("justuser");
        assert_eq!(credentials.username, "justuser");
        assert_eq!(credentials.password, "");
    }

    #[test]
    fn test_api_key_wins_over_username() {
        let options = ConfigOptions {
            api_key: Some("abc:123".to_string()),
            username: Some("other".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let config = ClientConfig::from_options(options);
        assert_eq!(config.credentials.unwrap().username, "abc");
    }

    #[test]
    fn test_individual_username_password() {
        let options = ConfigOptions {
            username: Some("foobar".to_string()),
            password: Some("1234567890".to_string()),
            ..Default::default()
        };
        let config = ClientConfig::from_options(options);
        assert_eq!(config.api_key, "");
        assert_eq!(
            config.credentials,
            Some(Credentials {
                username: "foobar".to_string(),
                password: "1234567890".to_string(),
            })
        );
    }

    #[test]
    fn test_endpoint() {
        let config = ClientConfig::from_options(ConfigOptions::default().host("127.0.0.1:8080"));
        assert_eq!(config.endpoint(), "http://127.0.0.1:8080/v1/json/");
    }

    #[test]
    fn test_options_from_json() {
        let options: ConfigOptions =
            serde_json::from_str(r#"{"host":"foobar.com","apiKey":"abc:123","cacheTtlSecs":12345}"#)
                .unwrap();
        assert_eq!(options.host.as_deref(), Some("foobar.com"));
        assert_eq!(options.api_key.as_deref(), Some("abc:123"));
        assert_eq!(options.cache_ttl_secs, Some(12345));
        assert_eq!(options.timeout_ms, None);
    }

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("Redis").unwrap(), CacheBackend::Redis);
        assert_eq!(parse_backend("memory").unwrap(), CacheBackend::Memory);
        assert_eq!(parse_backend("none").unwrap(), CacheBackend::None);
        assert!(parse_backend("memcached").is_err());
    }
}

/// Remote resolver - issues the WURFL Cloud lookup request
use crate::{
    cache::CacheGateway,
    config::ClientConfig,
    error::{ConfigError, DetectionError, DetectionResult},
    metrics,
    profile::DeviceProfile,
};
use reqwest::{
    header::{HeaderMap, AUTHORIZATION, USER_AGENT},
    Client, StatusCode,
};
use std::time::Instant;
use tracing::debug;

/// Header identifying this client to the API
pub const X_CLOUD_CLIENT: &str = "x-cloud-client";

/// Value sent in `X-Cloud-Client`
pub const CLIENT_ID: &str = concat!("rust/", env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Builds, sends and classifies lookup requests
#[derive(Clone)]
pub struct RemoteResolver {
    http_client: Client,
}

impl RemoteResolver {
    /// Create a resolver with its own HTTP client
    pub fn new() -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .gzip(true)
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self { http_client })
    }

    /// Resolve a User-Agent against the API
    ///
    /// Exactly one request is made. On success the profile is handed to the
    /// cache gateway, which writes it in the background.
    pub async fn fetch(
        &self,
        config: &ClientConfig,
        user_agent: &str,
        forwarded: Option<&HeaderMap>,
        extra_headers: Option<&HeaderMap>,
        cache: &CacheGateway,
    ) -> DetectionResult<DeviceProfile> {
        let uri = config.endpoint();
        debug!("Requesting device profile from {}", uri);

        let mut request = self
            .http_client
            .get(&uri)
            .headers(outbound_headers(config, forwarded, extra_headers))
            .header(USER_AGENT, user_agent)
            .header(X_CLOUD_CLIENT, CLIENT_ID)
            .timeout(config.timeout());

        if let Some(credentials) = &config.credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let started = Instant::now();
        let response = request.send().await.map_err(DetectionError::Transport)?;
        metrics::record_upstream_request(started.elapsed().as_secs_f64());

        let status = response.status();
        let body = response.text().await.map_err(DetectionError::Transport)?;

        if status != StatusCode::OK {
            debug!("WURFL Cloud answered {}", status);
            return Err(DetectionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let profile =
            DeviceProfile::from_response_body(&body).map_err(DetectionError::MalformedResponse)?;

        cache.store(user_agent, &profile, config.cache_ttl_secs);

        Ok(profile)
    }
}

/// Merge the forwarded fragment and the caller's extra headers.
///
/// Extra headers replace forwarded ones with the same name. `User-Agent` and
/// `X-Cloud-Client` are dropped here because the resolver always sets them
/// itself, and so is `Authorization` when credentials are configured.
/// Neither input map is modified.
pub fn outbound_headers(
    config: &ClientConfig,
    forwarded: Option<&HeaderMap>,
    extra_headers: Option<&HeaderMap>,
) -> HeaderMap {
    let mut headers = forwarded.cloned().unwrap_or_default();
    if let Some(extra) = extra_headers {
        headers.extend(extra.clone());
    }
    headers.remove(USER_AGENT);
    headers.remove(X_CLOUD_CLIENT);
    if config.credentials.is_some() {
        headers.remove(AUTHORIZATION);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOptions;
    use reqwest::header::HeaderValue;

    fn anonymous() -> ClientConfig {
        ClientConfig::default()
    }

    fn map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_client_id() {
        assert!(CLIENT_ID.starts_with("rust/wurfl-cloud-client "));
    }

    #[test]
    fn test_extra_headers_win_over_forwarded() {
        let forwarded = map(&[("x-forwarded-for", "10.0.0.1"), ("x-accept", "text/html")]);
        let extra = map(&[("x-accept", "application/json"), ("x-custom", "foobar")]);

        let headers = outbound_headers(&anonymous(), Some(&forwarded), Some(&extra));
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "10.0.0.1");
        assert_eq!(headers.get("x-accept").unwrap(), "application/json");
        assert_eq!(headers.get("x-custom").unwrap(), "foobar");
    }

    #[test]
    fn test_mandatory_headers_cannot_be_overridden() {
        let extra = map(&[("user-agent", "spoofed"), ("x-cloud-client", "other 9.9")]);
        let headers = outbound_headers(&anonymous(), None, Some(&extra));
        assert!(headers.get(USER_AGENT).is_none());
        assert!(headers.get(X_CLOUD_CLIENT).is_none());
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let forwarded = map(&[("x-accept", "text/html")]);
        let extra = map(&[("x-accept", "application/json"), ("user-agent", "spoofed")]);

        let _ = outbound_headers(&anonymous(), Some(&forwarded), Some(&extra));
        assert_eq!(forwarded.get("x-accept").unwrap(), "text/html");
        assert_eq!(extra.get("user-agent").unwrap(), "spoofed");
    }

    #[test]
    fn test_configured_credentials_replace_caller_authorization() {
        let config = ClientConfig::from_options(ConfigOptions::default().api_key("abc:123"));
        let extra = map(&[("authorization", "Bearer other"), ("x-custom", "foobar")]);

        let headers = outbound_headers(&config, None, Some(&extra));
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get("x-custom").unwrap(), "foobar");

        // Without credentials the caller's own header goes through
        let headers = outbound_headers(&anonymous(), None, Some(&extra));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer other");
    }

    #[test]
    fn test_repeated_forwarded_values_survive_merge() {
        let mut forwarded = HeaderMap::new();
        forwarded.append("x-accept", HeaderValue::from_static("text/html"));
        forwarded.append("x-accept", HeaderValue::from_static("application/xhtml+xml"));

        let headers = outbound_headers(&anonymous(), Some(&forwarded), None);
        assert_eq!(headers.get_all("x-accept").iter().count(), 2);
    }

    #[test]
    fn test_no_headers() {
        assert!(outbound_headers(&anonymous(), None, None).is_empty());
    }
}

/// Error types for device detection
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single device resolution.
///
/// Every call to [`crate::DeviceClient::detect_device`] either yields a
/// profile or exactly one of these variants. Cache failures never show up
/// here; they degrade to a cache miss.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// The caller supplied an empty User-Agent
    #[error("No User-Agent sent")]
    MissingUserAgent,

    /// The remote service could not be reached (DNS, connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The remote service answered with a non-200 status.
    ///
    /// `body` is the raw response text, kept verbatim because the service
    /// does not guarantee a JSON shape on errors.
    #[error("WURFL Cloud returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// 200 response whose body is not a device profile object
    #[error("Malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
}

impl DetectionError {
    /// Short machine-readable label, also used as the metrics outcome
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::MissingUserAgent => "missing_user_agent",
            DetectionError::Transport(_) => "transport_error",
            DetectionError::Upstream { .. } => "upstream_error",
            DetectionError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Errors raised by a [`crate::cache::DeviceCache`] backend
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid configuration, or a client that could not be set up from it
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Unknown cache backend: {0}")]
    UnknownCacheBackend(String),

    /// The HTTP client could not be built (TLS backend, system resolver)
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Errors from the demo HTTP server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body returned by the demo server
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for DetectionError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            DetectionError::MissingUserAgent => (StatusCode::BAD_REQUEST, "MissingUserAgent"),
            DetectionError::Transport(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, "UpstreamTimeout")
            }
            DetectionError::Transport(_) => (StatusCode::BAD_GATEWAY, "TransportError"),
            DetectionError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UpstreamError"),
            DetectionError::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "MalformedResponse"),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for device resolution
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Result type alias for cache backends
pub type CacheResult<T> = Result<T, CacheError>;

/// WURFL Cloud device detection client
///
/// Resolves a device capability profile from a User-Agent string by asking
/// the WURFL Cloud API, with a pluggable cache in front so the same device
/// signature is only looked up once per TTL.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod metrics;
pub mod middleware;
pub mod profile;
pub mod resolver;
pub mod server;

pub use client::DeviceClient;
pub use config::{ClientConfig, ConfigOptions, Credentials};
pub use error::{CacheError, DetectionError, DetectionResult};
pub use headers::{prepare_headers, InboundRequest};
pub use middleware::{detect_capabilities, DeviceCapabilities, DeviceDetectionLayer};
pub use profile::{CapabilityValue, DeviceProfile};

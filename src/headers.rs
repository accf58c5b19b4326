/// Inbound request header normalization
///
/// Maps the device-relevant headers of an inbound request onto the header
/// names WURFL Cloud expects, and builds the `x-forwarded-for` hop chain.
use axum::{
    extract::ConnectInfo,
    http::{header::HeaderName, HeaderMap, HeaderValue, Request},
};
use std::net::{IpAddr, SocketAddr};
use tracing::warn;

/// `x-forwarded-for`, nearest hop first
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Inbound header name -> outbound header name.
///
/// Applied in order; when two inbound names map to the same outbound name
/// the later entry wins.
pub const HEADERS_MAP: [(&str, &str); 8] = [
    ("accept", "x-accept"),
    ("x-wap-profile", "x-wap-profile"),
    ("profile", "x-wap-profile"),
    ("x-device-user-agent", "x-device-user-agent"),
    ("x-original-user-agent", "x-original-user-agent"),
    ("x-operamini-phone-ua", "x-operamini-phone-ua"),
    ("x-skyfire-phone", "x-skyfire-phone"),
    ("x-bolt-phone-ua", "x-bolt-phone-ua"),
];

/// What the normalizer needs from an inbound request
pub trait InboundRequest {
    fn headers(&self) -> &HeaderMap;

    /// Best-effort address of the connected client
    fn peer_address(&self) -> Option<IpAddr>;

    fn user_agent(&self) -> Option<&str> {
        self.headers()
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }
}

/// Works for axum requests (connection-level `ConnectInfo<SocketAddr>`) and
/// for plain hyper/tower stacks that store the client `SocketAddr` directly
/// in the request extensions.
impl<B> InboundRequest for Request<B> {
    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }

    fn peer_address(&self) -> Option<IpAddr> {
        let extensions = self.extensions();
        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .or_else(|| extensions.get::<SocketAddr>().map(SocketAddr::ip))
    }
}

/// Build the outbound header fragment for an inbound request
pub fn prepare_headers<R: InboundRequest + ?Sized>(request: &R) -> HeaderMap {
    let inbound = request.headers();
    let mut headers = HeaderMap::new();

    if let Some(chain) = forwarded_chain(request.peer_address(), inbound) {
        match HeaderValue::from_str(&chain) {
            Ok(value) => {
                headers.insert(X_FORWARDED_FOR, value);
            }
            Err(e) => warn!("Dropping unrepresentable x-forwarded-for {:?}: {}", chain, e),
        }
    }

    for (request_key, outbound_key) in HEADERS_MAP {
        let values: Vec<&HeaderValue> = inbound
            .get_all(request_key)
            .iter()
            .filter(|v| !v.is_empty())
            .collect();
        if values.is_empty() {
            continue;
        }

        // Repeated lines are all kept; a later table entry replaces an earlier one
        let name = HeaderName::from_static(outbound_key);
        headers.remove(&name);
        for value in values {
            headers.append(name.clone(), value.clone());
        }
    }

    headers
}

/// Peer address followed by the inbound chain. Repeated `x-forwarded-for`
/// lines are one list, joined in order.
fn forwarded_chain(peer: Option<IpAddr>, inbound: &HeaderMap) -> Option<String> {
    let hops: Vec<&str> = inbound
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    let upstream = (!hops.is_empty()).then(|| hops.join(","));

    match (peer, upstream) {
        (Some(ip), Some(chain)) => Some(format!("{},{}", ip, chain)),
        (Some(ip), None) => Some(ip.to_string()),
        (None, Some(chain)) => Some(chain),
        (None, None) => None,
    }
}

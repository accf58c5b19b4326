/// Request middleware that attaches device capabilities
///
/// Two adapters share the same behavior:
/// - [`detect_capabilities`] for axum's `middleware::from_fn_with_state`
/// - [`DeviceDetectionLayer`] for any tower `Service<http::Request<B>>`
///
/// Both resolve the requesting device and insert [`DeviceCapabilities`] into
/// the request extensions. Resolution failures are logged and the request
/// continues without capabilities.
use crate::{client::DeviceClient, profile::Capabilities};
use axum::{
    extract::{Request, State},
    http,
    middleware::Next,
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    ops::Deref,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

/// Capabilities of the requesting device, stored in request extensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceCapabilities(pub Capabilities);

impl Deref for DeviceCapabilities {
    type Target = Capabilities;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Resolve the device for `req` and attach its capabilities
pub async fn attach_capabilities<B>(client: &DeviceClient, req: &mut http::Request<B>) {
    let detection = client.detect_request(&*req, None);
    match detection.await {
        Ok(profile) => {
            req.extensions_mut()
                .insert(DeviceCapabilities(profile.capabilities));
        }
        Err(e) => {
            warn!("Device detection failed, continuing without capabilities: {}", e);
        }
    }
}

/// axum middleware
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(middleware::from_fn_with_state(client, detect_capabilities));
/// ```
pub async fn detect_capabilities(
    State(client): State<Arc<DeviceClient>>,
    mut req: Request,
    next: Next,
) -> Response {
    attach_capabilities(&client, &mut req).await;
    next.run(req).await
}

/// Tower layer running device detection before the inner service
#[derive(Clone)]
pub struct DeviceDetectionLayer {
    client: Arc<DeviceClient>,
}

impl DeviceDetectionLayer {
    pub fn new(client: Arc<DeviceClient>) -> Self {
        Self { client }
    }
}

impl<S> Layer<S> for DeviceDetectionLayer {
    type Service = DeviceDetectionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeviceDetectionService {
            inner,
            client: self.client.clone(),
        }
    }
}

/// Service produced by [`DeviceDetectionLayer`]
#[derive(Clone)]
pub struct DeviceDetectionService<S> {
    inner: S,
    client: Arc<DeviceClient>,
}

impl<S, B> Service<http::Request<B>> for DeviceDetectionService<S>
where
    S: Service<http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<S::Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let client = self.client.clone();
        // Take the service that was polled ready, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            attach_capabilities(&client, &mut req).await;
            inner.call(req).await
        })
    }
}

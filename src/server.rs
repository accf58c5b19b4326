/// Demo HTTP server showing the detection middleware in an axum app
use crate::{
    cache::{MemoryCache, RedisCache},
    client::DeviceClient,
    config::{CacheBackend, ClientConfig, ServerConfig},
    error::{DetectionResult, ServerError},
    metrics,
    middleware::{detect_capabilities, DeviceCapabilities},
    profile::DeviceProfile,
};
use axum::{
    extract::{Request, State},
    middleware,
    response::Json,
    routing::get,
    Extension, Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::time::{interval, Duration};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

/// Build the client and its cache store from the server configuration
pub async fn build_client(config: &ServerConfig) -> Result<Arc<DeviceClient>, ServerError> {
    let client = DeviceClient::with_config(ClientConfig::from_options(config.client.clone()))?;

    let client = match config.cache.backend {
        CacheBackend::None => {
            info!("Device cache disabled, every detection hits WURFL Cloud");
            client
        }
        CacheBackend::Memory => {
            let cache = Arc::new(MemoryCache::new());
            spawn_memory_cleanup(Arc::clone(&cache));
            client.with_cache(cache)
        }
        CacheBackend::Redis => {
            let cache = RedisCache::connect(&config.cache).await?;
            cache.ping().await?;
            client.with_cache(Arc::new(cache))
        }
    };

    Ok(Arc::new(client))
}

/// Drop expired in-process entries (runs every hour)
fn spawn_memory_cleanup(cache: Arc<MemoryCache>) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                info!("Cleaned up {} expired device cache entries", removed);
            }
        }
    });
}

/// Build the demo router
pub fn build_router(client: Arc<DeviceClient>) -> Router {
    // Only the index page goes through the middleware; /detect resolves explicitly
    let detected = Router::new()
        .route("/", get(index))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&client),
            detect_capabilities,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/detect", get(detect))
        .merge(detected)
        .with_state(client)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_handler() -> String {
    metrics::render_metrics()
}

/// Capabilities attached by the middleware, or `null`
async fn index(capabilities: Option<Extension<DeviceCapabilities>>) -> Json<serde_json::Value> {
    Json(json!({
        "capabilities": capabilities.map(|Extension(caps)| caps.0)
    }))
}

/// Resolve the caller's device, surfacing detection errors
async fn detect(
    State(client): State<Arc<DeviceClient>>,
    req: Request,
) -> DetectionResult<Json<DeviceProfile>> {
    let profile = client.detect_request(&req, None).await?;
    Ok(Json(profile))
}

/// Start the HTTP server
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.bind_address();
    let client = build_client(&config).await?;

    let app = build_router(client);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Device detection demo listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// WURFL Cloud device detection demo server
///
/// Serves a small axum app whose index page echoes the capabilities the
/// detection middleware attached to the request.
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wurfl_cloud_client::{config::ServerConfig, error::ServerError, server};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wurfl_cloud_client=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    server::serve(config).await
}

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use omni_yield::api::{create_rest_router, AppState};
use omni_yield::config::Config;
use omni_yield::services::Aggregator;

#[tokio::main(worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,omni_yield=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        "✓ Configuration loaded (live sources: {}, timeout {}s)",
        config.sources.live,
        config.sources.timeout_secs
    );

    let aggregator = Aggregator::new(&config);

    match aggregator.warm_up().await {
        Ok(w) => tracing::info!(
            "✓ Warm-up: {} protocols | {} pools | {} opportunities",
            w.protocols,
            w.pools,
            w.opportunities
        ),
        Err(e) => tracing::warn!("warm-up failed: {}", e),
    }

    let state = Arc::new(AppState { aggregator });
    let app = create_rest_router(state).layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("✓ Server ready on http://{}/api", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

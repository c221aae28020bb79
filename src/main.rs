//! UptimeView gateway binary.

use uptimeview::{Dashboard, DashboardOptions, HttpTransport, LoadState, ViewConfig};
use uptimeview::web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("uptimeview=info".parse()?))
        .init();

    // Load configuration
    let cfg = ViewConfig::load();
    tracing::info!("Starting UptimeView on port {}...", cfg.http_port);
    tracing::info!("Using monitoring backend at {}", cfg.api_url);
    if cfg.api_token.is_none() {
        tracing::warn!("UPTIMEVIEW_API_TOKEN is not set; authenticated routes will be rejected");
    }

    let transport = HttpTransport::from_config(&cfg)?;
    let dashboard = Arc::new(Dashboard::new(Arc::new(transport), DashboardOptions::from(&cfg)));

    // Warm the dashboard so the first request has data
    let snapshot = dashboard.refresh().await;
    match &snapshot.list {
        LoadState::Ready => {
            let with_data = snapshot.endpoints.iter().filter(|v| v.metrics.has_data()).count();
            tracing::info!(
                "Loaded {} endpoints ({} with observations)",
                snapshot.endpoints.len(),
                with_data
            );
        }
        LoadState::Unauthorized => tracing::warn!("Backend rejected the API token"),
        LoadState::Failed { reason } => tracing::warn!("Initial refresh failed: {}", reason),
        LoadState::Idle => {}
    }

    // Start web server
    let server = Server::new(cfg, dashboard);
    server.start().await?;

    Ok(())
}

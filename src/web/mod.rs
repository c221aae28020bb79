//! Web gateway module.
//!
//! Serves the derived dashboard state as JSON for a presentation client.

mod handlers;

pub use handlers::*;

use crate::config::ViewConfig;
use crate::dashboard::Dashboard;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ViewConfig,
    pub dashboard: Arc<Dashboard>,
}

/// JSON gateway for UptimeView.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ViewConfig, dashboard: Arc<Dashboard>) -> Self {
        Self {
            state: AppState { config, dashboard },
        }
    }

    /// Build the router with all routes.
    pub fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/healthz", get(handlers::handle_health))
            .route("/api/dashboard", get(handlers::handle_dashboard))
            .route("/api/alerts", get(handlers::handle_alerts))
            .route("/api/overview", get(handlers::handle_overview))
            .route("/api/endpoints", post(handlers::handle_create_endpoint))
            .route(
                "/api/endpoints/{id}",
                put(handlers::handle_update_endpoint).delete(handlers::handle_delete_endpoint),
            )
            .route("/api/endpoints/{id}/toggle", post(handlers::handle_toggle_endpoint))
            .route("/api/endpoints/{id}/logs", get(handlers::handle_endpoint_logs))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Gateway listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

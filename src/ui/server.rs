//! Console web server

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

use crate::aggregate::AggregationStore;
use crate::api::ReportClient;
use crate::config::UiConfig;
use crate::network::SharedConnectionState;
use crate::ui::handlers;

/// Shared state for all handlers
pub struct AppState {
    pub store: Arc<AggregationStore>,
    pub bus_state: SharedConnectionState,
    pub reports: ReportClient,
    pub started_at: Instant,
}

/// Teacher console web server
pub struct WebServer {
    config: UiConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(
        config: UiConfig,
        store: Arc<AggregationStore>,
        bus_state: SharedConnectionState,
        reports: ReportClient,
    ) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                store,
                bus_state,
                reports,
                started_at: Instant::now(),
            }),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(handlers::get_status))
            .route("/api/students", get(handlers::get_students))
            .route("/api/students/:id", get(handlers::get_student))
            .route("/api/students/:id/stop", post(handlers::stop_session))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start serving in a background task
    pub fn start_background(&self) -> JoinHandle<()> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.http_port);
        let router = self.router();

        tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::bind(&addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!("Console server failed to bind {}: {}", addr, e);
                    return;
                }
            };
            tracing::info!("Console API listening on http://{}", addr);
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Console server error: {}", e);
            }
        })
    }
}

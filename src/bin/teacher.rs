//! Teacher Console Application
//!
//! Subscribes to the multiplexed telemetry broadcast, aggregates
//! per-student state, and serves the dashboard's JSON surface.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proctor_telemetry::{
    aggregate::AggregationStore,
    api::{IdentityClient, ReportClient},
    config::AppConfig,
    network::TelemetryBus,
    protocol::Role,
    ui::WebServer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting teacher console");

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&PathBuf::from(path))?,
        None => AppConfig::load_default(),
    };

    // Identity gate: teachers only
    let identity_client = IdentityClient::new(config.identity.base_url.clone());
    let profile = identity_client
        .require_role(Role::Teacher)
        .await
        .context("identity check failed")?;
    tracing::info!("Authenticated as {} ({})", profile.name, profile.user_id);

    // Aggregation store lives exactly as long as this console session
    let store = Arc::new(AggregationStore::new(
        config.classifier.timeline_capacity,
        config.classifier.confusion_threshold,
    ));

    // Bus is the store's only mutation trigger
    let mut bus = TelemetryBus::new(store.clone(), config.stream.clone());
    bus.connect();
    tracing::info!("Telemetry bus started to {}", config.stream.broadcast_url);

    // Console JSON surface
    let web_server = WebServer::new(
        config.ui.clone(),
        store.clone(),
        bus.state_handle(),
        ReportClient::new(config.report.base_url.clone()),
    );
    let _web_handle = web_server.start_background();
    tracing::info!(
        "Console API available at http://{}:{}",
        config.ui.bind_address,
        config.ui.http_port
    );

    // Periodic stats until Ctrl+C
    let mut stats_tick = tokio::time::interval(std::time::Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = stats_tick.tick() => {
                let stats = bus.stats();
                tracing::info!(
                    "Bus: {} | {} ingested, {} dropped, {} students",
                    stats.state.label(),
                    stats.envelopes_ingested,
                    stats.envelopes_dropped,
                    store.student_count()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    bus.disconnect();
    Ok(())
}

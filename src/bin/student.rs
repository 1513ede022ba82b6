//! Student Agent Application
//!
//! Captures video frames and streams telemetry to the ingestion
//! endpoint over a resilient persistent connection.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proctor_telemetry::{
    api::IdentityClient,
    capture::{create_shared_slot, FrameCapture, SyntheticSource},
    config::AppConfig,
    network::{StudentIdentity, TelemetryLink},
    protocol::Role,
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

    tracing::info!("Starting student telemetry agent");

    // Config path from args, or platform default
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&PathBuf::from(path))?,
        None => AppConfig::load_default(),
    };

    // Identity gate: students only
    let identity_client = IdentityClient::new(config.identity.base_url.clone());
    let profile = identity_client
        .require_role(Role::Student)
        .await
        .context("identity check failed")?;
    tracing::info!("Authenticated as {} ({})", profile.name, profile.user_id);

    // Capture pipeline: device -> latest-frame slot.
    // Real cameras plug in behind the FrameSource trait; the synthetic
    // source stands in where no device integration is available.
    let slot = create_shared_slot();
    let source = SyntheticSource::new(config.stream.frame_width, config.stream.frame_height);
    let mut capture = FrameCapture::new(
        Box::new(source),
        slot.clone(),
        config.stream.capture_interval(),
    );

    // Device access is the one fatal failure: surfaces here, before
    // any network attempt
    capture.start().context("video device unavailable")?;
    tracing::info!("Frame capture started");

    // Telemetry link: handshake, settle, stream, reconnect forever
    let mut link = TelemetryLink::new(
        StudentIdentity {
            student_id: profile.user_id,
            student_name: Some(profile.name),
        },
        slot,
        config.stream.clone(),
    );
    link.connect();
    tracing::info!("Telemetry link started to {}", config.stream.ingest_url);

    // Periodic status logging until Ctrl+C
    let mut status_tick = tokio::time::interval(std::time::Duration::from_secs(5));
    loop {
        tokio::select! {
            _ = status_tick.tick() => {
                if let Some(e) = capture.check_errors() {
                    if e.is_fatal() {
                        link.disconnect();
                        capture.stop();
                        anyhow::bail!("capture failed: {e}");
                    }
                    tracing::warn!("Capture error: {}", e);
                }
                let stats = link.stats();
                tracing::info!(
                    "Status: {} | {} envelopes sent, {} ticks skipped, {} frames captured",
                    stats.state.label(),
                    stats.envelopes_sent,
                    stats.ticks_skipped,
                    capture.frames_captured()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    link.disconnect();
    capture.stop();
    Ok(())
}

//! Teacher-side telemetry bus
//!
//! A pure subscriber on the broadcast endpoint: same fixed-delay
//! reconnect policy as the student link but no handshake to send.
//! Every successfully decoded `telemetry` envelope is forwarded to the
//! aggregation store exactly once, in receipt order; malformed or
//! non-telemetry frames are dropped without touching connection state.

use futures_util::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::aggregate::AggregationStore;
use crate::config::StreamConfig;
use crate::error::{DecodeError, TransportError};
use crate::network::{new_shared_state, set_state, SharedConnectionState};
use crate::protocol::{ConnectionState, TelemetryEnvelope};

/// Bus statistics for the status line
#[derive(Debug, Clone)]
pub struct BusStats {
    pub envelopes_ingested: u64,
    pub envelopes_dropped: u64,
    pub state: ConnectionState,
}

/// Resilient subscriber feeding the aggregation store.
///
/// The store is the bus's only downstream; nothing else mutates it.
pub struct TelemetryBus {
    store: Arc<AggregationStore>,
    config: StreamConfig,
    state: SharedConnectionState,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    ingested: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryBus {
    pub fn new(store: Arc<AggregationStore>, config: StreamConfig) -> Self {
        Self {
            store,
            config,
            state: new_shared_state(),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            ingested: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the subscription loop. Idempotent like the student link.
    pub fn connect(&mut self) {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!("connect() ignored, bus already active");
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        self.task = Some(tokio::spawn(run_bus(
            self.store.clone(),
            self.config.clone(),
            self.state.clone(),
            self.running.clone(),
            self.ingested.clone(),
            self.dropped.clone(),
        )));
    }

    /// Tear down the subscription. Safe to call multiple times.
    pub fn disconnect(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        set_state(&self.state, ConnectionState::Closed);
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Shared handle for status displays
    pub fn state_handle(&self) -> SharedConnectionState {
        self.state.clone()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            envelopes_ingested: self.ingested.load(Ordering::Relaxed),
            envelopes_dropped: self.dropped.load(Ordering::Relaxed),
            state: self.state(),
        }
    }
}

impl Drop for TelemetryBus {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn run_bus(
    store: Arc<AggregationStore>,
    config: StreamConfig,
    state: SharedConnectionState,
    running: Arc<AtomicBool>,
    ingested: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
) {
    while running.load(Ordering::SeqCst) {
        set_state(&state, ConnectionState::Connecting);

        match connect_async(config.broadcast_url.as_str()).await {
            Ok((ws, _)) => {
                set_state(&state, ConnectionState::Open);
                tracing::info!("Telemetry bus subscribed to {}", config.broadcast_url);

                if let Err(e) = subscribe(ws, &store, &ingested, &dropped).await {
                    tracing::warn!("Bus subscription ended: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("Connect to {} failed: {}", config.broadcast_url, e);
            }
        }

        if !running.load(Ordering::SeqCst) {
            break;
        }
        set_state(&state, ConnectionState::Reconnecting);
        tokio::time::sleep(config.reconnect_delay()).await;
    }

    set_state(&state, ConnectionState::Closed);
}

/// Drain one connection's multiplexed stream into the store
async fn subscribe<S>(
    mut ws: S,
    store: &AggregationStore,
    ingested: &AtomicU64,
    dropped: &AtomicU64,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(text)) => match decode_envelope(&text) {
                Ok(envelope @ TelemetryEnvelope::Telemetry { .. }) => {
                    store.ingest(envelope);
                    ingested.fetch_add(1, Ordering::Relaxed);
                }
                Ok(TelemetryEnvelope::Init { student_id }) => {
                    // Handshake frames are not telemetry; dropped here
                    tracing::debug!("Dropping init frame from {}", student_id);
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    tracing::debug!("Dropping inbound frame: {}", e);
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
            },
            Ok(Message::Binary(payload)) => {
                tracing::debug!("{}", DecodeError::UnexpectedBinary(payload.len()));
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Message::Close(_)) => return Err(TransportError::Closed),
            Ok(_) => {} // ping/pong
            Err(e) => return Err(TransportError::ReceiveFailed(e.to_string())),
        }
    }
    Err(TransportError::Closed)
}

fn decode_envelope(text: &str) -> Result<TelemetryEnvelope, DecodeError> {
    serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_telemetry_frame() {
        let raw = r#"{"type":"telemetry","student_id":"s1","data":{"timestamp":1,"face_count":1}}"#;
        assert!(matches!(
            decode_envelope(raw),
            Ok(TelemetryEnvelope::Telemetry { .. })
        ));
    }

    #[test]
    fn test_decode_malformed_frame() {
        assert!(decode_envelope("{not json").is_err());
        assert!(decode_envelope(r#"{"type":"unknown"}"#).is_err());
    }
}

//! Student-side telemetry link
//!
//! Owns one resilient persistent connection to the ingestion endpoint.
//! On open it sends exactly one `init` envelope, waits a settle delay
//! so the receiver can process the handshake, then streams telemetry
//! on a fixed cadence by pulling the latest encoded frame. Unexpected
//! closure schedules exactly one reconnect after a fixed delay, forever;
//! `connect` while a non-closed connection exists is a no-op.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::capture::frame::SharedFrameSlot;
use crate::codec::FrameEncoder;
use crate::config::StreamConfig;
use crate::error::TransportError;
use crate::network::{new_shared_state, set_state, SharedConnectionState};
use crate::protocol::{ConnectionState, TelemetryEnvelope, TelemetrySample};

/// Who this link streams for, as reported by the identity service
#[derive(Debug, Clone)]
pub struct StudentIdentity {
    pub student_id: String,
    pub student_name: Option<String>,
}

/// Link statistics for the status line
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub envelopes_sent: u64,
    pub ticks_skipped: u64,
    pub state: ConnectionState,
}

/// Resilient student-side connection with a start/stop lifecycle.
///
/// All timers and the socket live inside one task owned by this
/// struct; `disconnect` (or drop) cancels everything.
pub struct TelemetryLink {
    identity: StudentIdentity,
    slot: SharedFrameSlot,
    config: StreamConfig,
    state: SharedConnectionState,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
    envelopes_sent: Arc<AtomicU64>,
    ticks_skipped: Arc<AtomicU64>,
}

impl TelemetryLink {
    pub fn new(identity: StudentIdentity, slot: SharedFrameSlot, config: StreamConfig) -> Self {
        Self {
            identity,
            slot,
            config,
            state: new_shared_state(),
            running: Arc::new(AtomicBool::new(false)),
            task: None,
            envelopes_sent: Arc::new(AtomicU64::new(0)),
            ticks_skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the connection loop.
    ///
    /// Idempotent: if a non-closed connection already exists this does
    /// nothing, so rapid re-entry cannot create duplicate connections.
    pub fn connect(&mut self) {
        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            tracing::debug!("connect() ignored, link already active");
            return;
        }

        self.running.store(true, Ordering::SeqCst);
        self.task = Some(tokio::spawn(run_link(
            self.identity.clone(),
            self.slot.clone(),
            self.config.clone(),
            self.state.clone(),
            self.running.clone(),
            self.envelopes_sent.clone(),
            self.ticks_skipped.clone(),
        )));
    }

    /// Cancel all timers and close the connection.
    /// Safe to call multiple times.
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

    /// Human-readable status string
    pub fn status_label(&self) -> &'static str {
        self.state().label()
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats {
            envelopes_sent: self.envelopes_sent.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            state: self.state(),
        }
    }
}

impl Drop for TelemetryLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Connection loop: connect, stream until failure, back off, repeat.
/// Transport faults are never fatal here.
#[allow(clippy::too_many_arguments)]
async fn run_link(
    identity: StudentIdentity,
    slot: SharedFrameSlot,
    config: StreamConfig,
    state: SharedConnectionState,
    running: Arc<AtomicBool>,
    envelopes_sent: Arc<AtomicU64>,
    ticks_skipped: Arc<AtomicU64>,
) {
    let mut encoder = FrameEncoder::new(config.jpeg_quality);

    while running.load(Ordering::SeqCst) {
        set_state(&state, ConnectionState::Connecting);

        match connect_async(config.ingest_url.as_str()).await {
            Ok((ws, _)) => {
                set_state(&state, ConnectionState::Open);
                tracing::info!("Telemetry link open to {}", config.ingest_url);

                let result = stream_session(
                    ws,
                    &identity,
                    &slot,
                    &config,
                    &mut encoder,
                    &envelopes_sent,
                    &ticks_skipped,
                )
                .await;

                if let Err(e) = result {
                    tracing::warn!("Telemetry session ended: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("Connect to {} failed: {}", config.ingest_url, e);
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

/// One connection's lifetime: handshake, settle, then cadence-driven
/// telemetry until the transport fails
async fn stream_session<S>(
    ws: S,
    identity: &StudentIdentity,
    slot: &SharedFrameSlot,
    config: &StreamConfig,
    encoder: &mut FrameEncoder,
    envelopes_sent: &AtomicU64,
    ticks_skipped: &AtomicU64,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Sink<Message>
        + Unpin,
    <S as Sink<Message>>::Error: std::fmt::Display,
{
    let (mut sink, mut stream) = ws.split();

    // Exactly one init envelope before any telemetry
    let init = TelemetryEnvelope::Init {
        student_id: identity.student_id.clone(),
    };
    send_envelope(&mut sink, &init).await?;
    tokio::time::sleep(config.settle_delay()).await;

    let mut ticker = tokio::time::interval(config.send_interval());
    // Time-triggered, not ack-triggered: missed ticks are dropped,
    // never bursted
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(frame) = slot.take().filter(|f| !f.is_empty()) else {
                    // Device has not produced a usable frame yet;
                    // skip this tick, send nothing partial
                    ticks_skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                };

                match encoder.encode_payload(&frame) {
                    Ok(payload) => {
                        let envelope = TelemetryEnvelope::Telemetry {
                            student_id: identity.student_id.clone(),
                            student_name: identity.student_name.clone(),
                            data: TelemetrySample::from_frame(payload),
                        };
                        send_envelope(&mut sink, &envelope).await?;
                        envelopes_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!("Frame encode failed: {}", e);
                        ticks_skipped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                    Some(Ok(_)) => {} // the ingestion endpoint pushes nothing we act on
                    Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                }
            }
        }
    }
}

async fn send_envelope<S>(sink: &mut S, envelope: &TelemetryEnvelope) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(envelope)
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
    sink.send(Message::Text(text))
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))
}

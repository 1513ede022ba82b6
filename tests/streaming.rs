//! Connection lifecycle tests for the student link and teacher bus,
//! run against an in-process WebSocket endpoint.

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use proctor_telemetry::aggregate::AggregationStore;
use proctor_telemetry::capture::{create_shared_slot, SharedFrameSlot, VideoFrame};
use proctor_telemetry::classify::{StudentStatus, DEFAULT_CONFUSION_THRESHOLD};
use proctor_telemetry::config::StreamConfig;
use proctor_telemetry::constants::TIMELINE_CAPACITY;
use proctor_telemetry::network::{StudentIdentity, TelemetryBus, TelemetryLink};
use proctor_telemetry::protocol::{ConnectionState, TelemetryEnvelope};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Fast cadence so the tests finish quickly; policy is identical
fn test_config(port: u16) -> StreamConfig {
    StreamConfig {
        ingest_url: format!("ws://127.0.0.1:{port}"),
        broadcast_url: format!("ws://127.0.0.1:{port}"),
        send_interval_ms: 50,
        settle_delay_ms: 30,
        reconnect_delay_ms: 100,
        ..Default::default()
    }
}

fn identity() -> StudentIdentity {
    StudentIdentity {
        student_id: "s1".into(),
        student_name: Some("Ada".into()),
    }
}

fn publish_frame(slot: &SharedFrameSlot, seq: u32) {
    slot.publish(VideoFrame::new(vec![100u8; 16 * 16 * 3], 16, 16, seq));
}

/// Ingestion-endpoint stand-in: counts connections and forwards every
/// decoded envelope
async fn spawn_ingest_server() -> (
    u16,
    Arc<AtomicUsize>,
    mpsc::UnboundedReceiver<TelemetryEnvelope>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let connections = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::unbounded_channel();

    let counter = connections.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let tx = tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        if let Ok(envelope) = serde_json::from_str::<TelemetryEnvelope>(&text) {
                            let _ = tx.send(envelope);
                        }
                    }
                }
            });
        }
    });

    (port, connections, rx)
}

#[tokio::test]
async fn handshake_precedes_telemetry() {
    let (port, _connections, mut rx) = spawn_ingest_server().await;

    let slot = create_shared_slot();
    publish_frame(&slot, 0);

    let mut link = TelemetryLink::new(identity(), slot, test_config(port));
    link.connect();

    let first = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    match first {
        TelemetryEnvelope::Init { student_id } => assert_eq!(student_id, "s1"),
        other => panic!("first frame was not init: {other:?}"),
    }

    let second = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    match second {
        TelemetryEnvelope::Telemetry {
            student_id,
            student_name,
            data,
        } => {
            assert_eq!(student_id, "s1");
            assert_eq!(student_name.as_deref(), Some("Ada"));
            let payload = data.frame.expect("telemetry without frame payload");
            assert!(payload.starts_with("data:image/jpeg;base64,"));
        }
        other => panic!("second frame was not telemetry: {other:?}"),
    }

    link.disconnect();
}

#[tokio::test]
async fn connect_is_idempotent_under_rapid_reentry() {
    let (port, connections, _rx) = spawn_ingest_server().await;

    let slot = create_shared_slot();
    let mut link = TelemetryLink::new(identity(), slot, test_config(port));

    // Rapid re-entry before and after the socket opens
    link.connect();
    link.connect();
    link.connect();
    tokio::time::sleep(Duration::from_millis(200)).await;
    link.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(connections.load(Ordering::SeqCst), 1);
    link.disconnect();
}

#[tokio::test]
async fn ticks_without_frames_send_nothing() {
    let (port, _connections, mut rx) = spawn_ingest_server().await;

    // Slot stays empty for the whole test
    let slot = create_shared_slot();
    let mut link = TelemetryLink::new(identity(), slot, test_config(port));
    link.connect();

    let first = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert!(matches!(first, TelemetryEnvelope::Init { .. }));

    // Several cadence periods pass; no partial or empty payload appears
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err());
    assert!(link.stats().ticks_skipped > 0);

    link.disconnect();
}

#[tokio::test]
async fn link_reconnects_after_server_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let connections = Arc::new(AtomicUsize::new(0));

    // Endpoint that accepts and immediately hangs up
    let counter = connections.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                if let Ok(ws) = accept_async(stream).await {
                    drop(ws);
                }
            });
        }
    });

    let slot = create_shared_slot();
    let mut link = TelemetryLink::new(identity(), slot, test_config(port));
    link.connect();

    // With a 100ms reconnect delay, several attempts land quickly
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(
        connections.load(Ordering::SeqCst) >= 2,
        "link never reconnected"
    );

    link.disconnect();
    assert_eq!(link.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let (port, _connections, _rx) = spawn_ingest_server().await;

    let slot = create_shared_slot();
    let mut link = TelemetryLink::new(identity(), slot, test_config(port));
    link.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    link.disconnect();
    link.disconnect();
    assert_eq!(link.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn bus_ingests_broadcast_and_drops_noise() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    // Broadcast-endpoint stand-in: pushes a handshake, garbage, and
    // two telemetry envelopes, then idles
    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(mut ws) = accept_async(stream).await else {
            return;
        };

        let frames = [
            r#"{"type":"init","student_id":"s1"}"#.to_string(),
            "{definitely not json".to_string(),
            serde_json::json!({
                "type": "telemetry",
                "student_id": "s1",
                "student_name": "Ada",
                "data": {
                    "timestamp": 1,
                    "face_count": 1,
                    "confusion_score": 0.9,
                    "emotion": "Focused / Neutral",
                    "gaze": "CENTER"
                }
            })
            .to_string(),
            serde_json::json!({
                "type": "telemetry",
                "student_id": "s2",
                "data": {
                    "timestamp": 2,
                    "face_count": 0,
                    "emotion": "Unknown",
                    "gaze": "CENTER"
                }
            })
            .to_string(),
        ];
        for frame in frames {
            if ws.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
        // Hold the connection open
        while ws.next().await.is_some() {}
    });

    let store = Arc::new(AggregationStore::new(
        TIMELINE_CAPACITY,
        DEFAULT_CONFUSION_THRESHOLD,
    ));
    let mut bus = TelemetryBus::new(store.clone(), test_config(port));
    bus.connect();

    // Wait for both students to land
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while store.student_count() < 2 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "bus never ingested both students"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let s1 = store.get("s1").unwrap();
    assert_eq!(s1.student_name.as_deref(), Some("Ada"));
    assert_eq!(s1.status, StudentStatus::Confused);
    assert_eq!(s1.timeline.len(), 1);

    let s2 = store.get("s2").unwrap();
    assert_eq!(s2.status, StudentStatus::ProctorAlert);

    // Handshake and garbage were dropped without killing the stream
    let stats = bus.stats();
    assert_eq!(stats.envelopes_ingested, 2);
    assert!(stats.envelopes_dropped >= 2);
    assert_eq!(stats.state, ConnectionState::Open);

    bus.disconnect();
}

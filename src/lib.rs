//! # Proctor Telemetry Streamer
//!
//! Real-time telemetry streaming and aggregation for live remote
//! proctoring.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────── STUDENT ──────────────────────────────┐
//! │  ┌─────────────┐    ┌─────────────┐    ┌───────────────────┐     │
//! │  │ FrameSource │───▶│  FrameSlot  │───▶│   TelemetryLink   │     │
//! │  │ (capture    │    │ (latest     │    │  init handshake,  │     │
//! │  │  thread)    │    │  frame)     │    │  500ms send tick, │     │
//! │  └─────────────┘    └─────────────┘    │  2s reconnect     │     │
//! │                            ▲           └─────────┬─────────┘     │
//! │                     FrameEncoder (JPEG → base64) │               │
//! └──────────────────────────────────────────────────┼───────────────┘
//!                                                    │ WebSocket
//!                                 ingestion endpoint ▼ (JSON frames)
//!                              ┌───────────────────────────┐
//!                              │     relay / inference     │
//!                              └─────────────┬─────────────┘
//!                                            │ broadcast endpoint
//! ┌─────────────────────────── TEACHER ──────┼───────────────────────┐
//! │  ┌───────────────────┐    ┌──────────────▼──────────────┐        │
//! │  │    Console API    │◀───│        TelemetryBus         │        │
//! │  │ snapshot / stop   │    │  decode, drop malformed,    │        │
//! │  └─────────┬─────────┘    │  2s reconnect               │        │
//! │            │              └──────────────┬──────────────┘        │
//! │            ▼                             ▼                       │
//! │  ┌───────────────────┐    ┌─────────────────────────────┐        │
//! │  │   report service  │    │      AggregationStore       │        │
//! │  │   (stop action)   │    │  per-student record,        │        │
//! │  └───────────────────┘    │  60-point timeline,         │        │
//! │                           │  classify on ingest         │        │
//! │                           └─────────────────────────────┘        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod api;
pub mod capture;
pub mod classify;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Telemetry send cadence in milliseconds
    pub const SEND_INTERVAL_MS: u64 = 500;

    /// Delay after the init handshake before telemetry starts,
    /// letting the receiver process the handshake
    pub const HANDSHAKE_SETTLE_MS: u64 = 300;

    /// Fixed delay before a reconnect attempt
    pub const RECONNECT_DELAY_MS: u64 = 2000;

    /// Rolling timeline capacity per student
    pub const TIMELINE_CAPACITY: usize = 60;

    /// Capture pace in milliseconds (~30 fps)
    pub const CAPTURE_INTERVAL_MS: u64 = 33;

    /// Default JPEG quality for encoded frames
    pub const DEFAULT_JPEG_QUALITY: u8 = 80;

    /// Default console HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Default identity/report service base URL
    pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

    /// Default student ingestion endpoint
    pub const DEFAULT_INGEST_URL: &str = "ws://127.0.0.1:8000/ws/student";

    /// Default teacher broadcast endpoint
    pub const DEFAULT_BROADCAST_URL: &str = "ws://127.0.0.1:8000/ws/teacher";
}

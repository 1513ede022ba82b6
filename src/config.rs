//! Application configuration
//!
//! Loaded from a TOML file when one exists, otherwise defaults. Every
//! tunable the streaming loop and the classifier use lives here; the
//! code never hardcodes a cadence or a threshold.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::Error;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub stream: StreamConfig,
    pub classifier: ClassifierConfig,
    pub report: ReportConfig,
    pub ui: UiConfig,
}

/// Identity service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub base_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Streaming cadence and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Student ingestion endpoint (persistent connection)
    pub ingest_url: String,
    /// Teacher broadcast endpoint (persistent connection)
    pub broadcast_url: String,
    /// Telemetry send cadence in milliseconds
    pub send_interval_ms: u64,
    /// Delay after the handshake before telemetry starts
    pub settle_delay_ms: u64,
    /// Fixed delay before a reconnect attempt
    pub reconnect_delay_ms: u64,
    /// Capture pace in milliseconds
    pub capture_interval_ms: u64,
    /// JPEG quality for encoded frames, 1-100
    pub jpeg_quality: u8,
    /// Synthetic/device frame width
    pub frame_width: u32,
    /// Synthetic/device frame height
    pub frame_height: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ingest_url: DEFAULT_INGEST_URL.to_string(),
            broadcast_url: DEFAULT_BROADCAST_URL.to_string(),
            send_interval_ms: SEND_INTERVAL_MS,
            settle_delay_ms: HANDSHAKE_SETTLE_MS,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            capture_interval_ms: CAPTURE_INTERVAL_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl StreamConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }
}

/// Classification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Confusion threshold; one build shipped 0.58, reachable here
    pub confusion_threshold: f32,
    /// Rolling timeline capacity per student
    pub timeline_capacity: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confusion_threshold: crate::classify::DEFAULT_CONFUSION_THRESHOLD,
            timeline_capacity: TIMELINE_CAPACITY,
        }
    }
}

/// Report service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub base_url: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Teacher console HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub bind_address: String,
    pub http_port: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from the platform config directory if a file exists there,
    /// otherwise defaults
    pub fn load_default() -> Self {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}, using defaults", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Platform config file location
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "proctor-telemetry")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

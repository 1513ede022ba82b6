//! Wire protocol types shared by the student link, the teacher bus,
//! and the external identity/report services.
//!
//! All traffic is JSON text frames. Telemetry envelopes are internally
//! tagged on `type` so the receiver can ignore handshake and unknown
//! frames without error.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One inference-derived measurement of a student's state at an instant.
///
/// Produced by the inference collaborator on the server side; the
/// student link only fills `timestamp` and `frame`. All analysis fields
/// are optional on the wire so partially populated samples still decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Wall-clock milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Encoded frame payload (base64 data URL), upstream direction only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,

    /// Raw confusion score in [0, 1]; `None` means the signal was
    /// unavailable, which classifies like 0 but is stored distinctly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confusion_score: Option<f32>,

    /// Rolling-average confusion computed server-side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothed_confusion: Option<f32>,

    /// Explicit confused flag from the inference engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confused: Option<bool>,

    /// Per-sample threshold override; beats the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confusion_threshold: Option<f32>,

    /// Number of faces detected in the frame
    #[serde(default)]
    pub face_count: u32,

    /// Emotion label, e.g. "Happy / Engaged"
    #[serde(default)]
    pub emotion: String,

    /// Gaze direction label, e.g. "CENTER"
    #[serde(default)]
    pub gaze: String,
}

impl TelemetrySample {
    /// Build the upstream sample a student sends: just a frame payload
    /// and a timestamp; analysis fields are filled in server-side.
    pub fn from_frame(payload: String) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            frame: Some(payload),
            ..Default::default()
        }
    }
}

/// Wire message wrapping a telemetry sample with routing metadata.
///
/// `Init` is handshake-only and carries no sample; it must be the first
/// message on a freshly opened student connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TelemetryEnvelope {
    Init {
        student_id: String,
    },
    Telemetry {
        student_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        student_name: Option<String>,
        data: TelemetrySample,
    },
}

impl TelemetryEnvelope {
    /// Student id this envelope is routed by
    pub fn student_id(&self) -> &str {
        match self {
            TelemetryEnvelope::Init { student_id } => student_id,
            TelemetryEnvelope::Telemetry { student_id, .. } => student_id,
        }
    }
}

/// One point of a student's bounded engagement timeline.
/// Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// Arrival timestamp, milliseconds since the Unix epoch
    pub t: i64,
    /// Confusion score at this point (absent score stored as 0.0)
    pub confusion: f32,
    /// Emotion label at this point
    pub emotion: String,
    /// Faces visible at this point
    pub face_count: u32,
}

impl TimelinePoint {
    /// Derive a timeline point from an ingested sample
    pub fn from_sample(sample: &TelemetrySample) -> Self {
        Self {
            t: sample.timestamp,
            confusion: sample.confusion_score.unwrap_or(0.0),
            emotion: sample.emotion.clone(),
            face_count: sample.face_count,
        }
    }
}

/// Lifecycle of one persistent connection.
///
/// Rebuilt on every mount, never persisted. `Error` folds into
/// `Reconnecting` unless it follows a fatal device error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Reconnecting,
    Closed,
    Error,
}

impl ConnectionState {
    /// Human-readable status string for the UI header
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Open => "Live",
            ConnectionState::Reconnecting => "Reconnecting...",
            ConnectionState::Closed => "Disconnected",
            ConnectionState::Error => "Error",
        }
    }

    /// A non-closed connection exists or is being established;
    /// attempting another connect must be a no-op
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }
}

/// User role as reported by the identity service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
        }
    }
}

/// Identity payload from `GET /me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub role: Role,
    pub name: String,
}

/// Aggregate percentages over a session, integer-rounded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub confused_pct: u32,
    pub happy_pct: u32,
    pub focused_pct: u32,
}

/// One point of the report service's smoothed timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPoint {
    pub timestamp: String,
    pub smoothed_confusion: f32,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub face_count: u32,
}

/// Student identity attached to a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportStudent {
    pub name: String,
}

/// Full report payload from `GET /report/student/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentReport {
    pub student: ReportStudent,
    pub summary: ReportSummary,
    pub timeline: Vec<ReportPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_envelope_shape() {
        let env = TelemetryEnvelope::Init {
            student_id: "s1".into(),
        };
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "init");
        assert_eq!(json["student_id"], "s1");
        // Handshake frames never carry a sample
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_telemetry_envelope_decodes_backend_shape() {
        let raw = r#"{
            "type": "telemetry",
            "student_id": "7",
            "student_name": "Ada",
            "data": {
                "student_id": "7",
                "timestamp": 1700000000000,
                "face_count": 1,
                "gaze": "CENTER",
                "emotion": "Happy / Engaged",
                "confusion_score": 0.12,
                "smoothed_confusion": 0.2,
                "confused": false,
                "confusion_threshold": 0.58
            }
        }"#;
        let env: TelemetryEnvelope = serde_json::from_str(raw).unwrap();
        match env {
            TelemetryEnvelope::Telemetry {
                student_id,
                student_name,
                data,
            } => {
                assert_eq!(student_id, "7");
                assert_eq!(student_name.as_deref(), Some("Ada"));
                assert_eq!(data.face_count, 1);
                assert_eq!(data.confusion_score, Some(0.12));
                assert_eq!(data.confusion_threshold, Some(0.58));
            }
            other => panic!("decoded wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_sample_missing_fields_default() {
        let raw = r#"{"timestamp": 0, "face_count": 0}"#;
        let sample: TelemetrySample = serde_json::from_str(raw).unwrap();
        assert_eq!(sample.confusion_score, None);
        assert_eq!(sample.emotion, "");
        assert_eq!(sample.gaze, "");
    }

    #[test]
    fn test_upstream_sample_skips_absent_fields() {
        let sample = TelemetrySample::from_frame("data:image/jpeg;base64,AAAA".into());
        let json = serde_json::to_value(&sample).unwrap();
        assert!(json.get("confusion_score").is_none());
        assert!(json.get("confused").is_none());
        assert!(json["frame"].as_str().unwrap().starts_with("data:image/jpeg"));
    }

    #[test]
    fn test_connection_state_labels() {
        assert_eq!(ConnectionState::Open.label(), "Live");
        assert!(ConnectionState::Reconnecting.is_active());
        assert!(!ConnectionState::Closed.is_active());
    }

    #[test]
    fn test_timeline_point_from_sample() {
        let sample = TelemetrySample {
            timestamp: 42,
            face_count: 1,
            emotion: "Focused / Neutral".into(),
            ..Default::default()
        };
        let point = TimelinePoint::from_sample(&sample);
        assert_eq!(point.t, 42);
        // Absent score is carried as 0.0 on the timeline
        assert_eq!(point.confusion, 0.0);
    }
}

//! Engagement classification
//!
//! A pure priority chain mapping one telemetry sample to a discrete
//! badge state. The ordering of the checks IS the policy: a missing or
//! multiple-face condition invalidates the confusion signal, so the
//! proctor alert always wins; confusion beats emotion; emotion beats
//! the default.
//!
//! Used both for live badges on ingest and for coloring historical
//! timeline points, so it must stay deterministic and total.

use serde::{Deserialize, Serialize};

use crate::protocol::{TelemetrySample, TimelinePoint};

/// Default confusion threshold. The 0.58 variant that shipped in one
/// build is reachable through configuration or a per-sample override,
/// never a second code path.
pub const DEFAULT_CONFUSION_THRESHOLD: f32 = 0.45;

/// Emotion substrings that count as engagement-positive, matched
/// case-insensitively
const ENGAGED_MARKERS: &[&str] = &["happy", "smile"];

/// Discrete engagement/alert state for one student at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    /// No telemetry yet
    Unknown,
    /// Zero or multiple faces in frame
    ProctorAlert,
    /// Confusion score at or above threshold, or explicit flag
    Confused,
    /// Engagement-positive emotion
    Engaged,
    /// Default state
    Focused,
}

impl StudentStatus {
    /// Badge color rendered by the dashboard
    pub fn color(&self) -> &'static str {
        match self {
            StudentStatus::Unknown => "gray",
            StudentStatus::ProctorAlert => "red",
            StudentStatus::Confused => "yellow",
            StudentStatus::Engaged => "blue",
            StudentStatus::Focused => "green",
        }
    }

    /// Badge text rendered by the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            StudentStatus::Unknown => "Waiting for student...",
            StudentStatus::ProctorAlert => "Proctor Alert",
            StudentStatus::Confused => "Student Confused",
            StudentStatus::Engaged => "Student Engaged",
            StudentStatus::Focused => "Student Focused",
        }
    }
}

/// Classify one sample against a default threshold.
///
/// A per-sample `confusion_threshold` override beats `default_threshold`;
/// an absent confusion score classifies as 0.0.
pub fn classify(sample: Option<&TelemetrySample>, default_threshold: f32) -> StudentStatus {
    let Some(sample) = sample else {
        return StudentStatus::Unknown;
    };

    if sample.face_count != 1 {
        return StudentStatus::ProctorAlert;
    }

    let threshold = sample.confusion_threshold.unwrap_or(default_threshold);
    let score = sample.confusion_score.unwrap_or(0.0);
    if sample.confused == Some(true) || score >= threshold {
        return StudentStatus::Confused;
    }

    if is_engaged_emotion(&sample.emotion) {
        return StudentStatus::Engaged;
    }

    StudentStatus::Focused
}

/// Classify a historical timeline point for report coloring.
///
/// Timeline points carry the score as a plain float and no override or
/// confused flag, so only the configured threshold applies.
pub fn classify_point(point: &TimelinePoint, threshold: f32) -> StudentStatus {
    if point.face_count != 1 {
        return StudentStatus::ProctorAlert;
    }
    if point.confusion >= threshold {
        return StudentStatus::Confused;
    }
    if is_engaged_emotion(&point.emotion) {
        return StudentStatus::Engaged;
    }
    StudentStatus::Focused
}

fn is_engaged_emotion(emotion: &str) -> bool {
    let lowered = emotion.to_lowercase();
    ENGAGED_MARKERS.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(face_count: u32, score: Option<f32>, emotion: &str) -> TelemetrySample {
        TelemetrySample {
            timestamp: 0,
            face_count,
            confusion_score: score,
            emotion: emotion.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_sample_is_unknown() {
        assert_eq!(
            classify(None, DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::Unknown
        );
    }

    #[test]
    fn test_focused_neutral_classifies_focused() {
        let s = sample(1, Some(0.1), "Focused / Neutral");
        assert_eq!(
            classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::Focused
        );
    }

    #[test]
    fn test_face_count_wins_over_confusion() {
        // No face invalidates the confusion signal entirely
        let s = sample(0, Some(0.99), "Happy / Engaged");
        assert_eq!(
            classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::ProctorAlert
        );

        let s = sample(2, Some(0.0), "");
        assert_eq!(
            classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::ProctorAlert
        );
    }

    #[test]
    fn test_threshold_is_configurable() {
        let s = sample(1, Some(0.5), "Focused / Neutral");
        assert_eq!(classify(Some(&s), 0.45), StudentStatus::Confused);
        assert_eq!(classify(Some(&s), 0.58), StudentStatus::Focused);
    }

    #[test]
    fn test_per_sample_threshold_override() {
        let mut s = sample(1, Some(0.5), "");
        s.confusion_threshold = Some(0.58);
        // Override beats the stricter configured default
        assert_eq!(classify(Some(&s), 0.45), StudentStatus::Focused);

        s.confusion_threshold = Some(0.3);
        assert_eq!(classify(Some(&s), 0.58), StudentStatus::Confused);
    }

    #[test]
    fn test_explicit_confused_flag_forces_confused() {
        let mut s = sample(1, Some(0.0), "Happy / Engaged");
        s.confused = Some(true);
        assert_eq!(
            classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::Confused
        );
    }

    #[test]
    fn test_engaged_marker_case_insensitive() {
        for emotion in ["Happy / Engaged", "happy", "SMILE", "slight smile"] {
            let s = sample(1, Some(0.0), emotion);
            assert_eq!(
                classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD),
                StudentStatus::Engaged,
                "emotion {emotion:?}"
            );
        }
    }

    #[test]
    fn test_absent_score_classifies_as_zero() {
        let s = sample(1, None, "");
        assert_eq!(
            classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::Focused
        );
    }

    #[test]
    fn test_point_classification_matches_chain() {
        let point = TimelinePoint {
            t: 0,
            confusion: 0.9,
            emotion: "Happy / Engaged".into(),
            face_count: 0,
        };
        assert_eq!(
            classify_point(&point, DEFAULT_CONFUSION_THRESHOLD),
            StudentStatus::ProctorAlert
        );
    }

    proptest! {
        // Total over the whole input grid: exactly one live state comes
        // back for any sample, and the priority chain holds
        #[test]
        fn prop_classify_total_and_ordered(
            face_count in 0u32..=2,
            score in 0.0f32..=1.0,
            emotion_idx in 0usize..4,
        ) {
            let emotion = ["Happy / Engaged", "Focused / Neutral", "", "Surprised"][emotion_idx];
            let s = sample(face_count, Some(score), emotion);
            let status = classify(Some(&s), DEFAULT_CONFUSION_THRESHOLD);

            if face_count != 1 {
                prop_assert_eq!(status, StudentStatus::ProctorAlert);
            } else if score >= DEFAULT_CONFUSION_THRESHOLD {
                prop_assert_eq!(status, StudentStatus::Confused);
            } else if emotion_idx == 0 {
                prop_assert_eq!(status, StudentStatus::Engaged);
            } else {
                prop_assert_eq!(status, StudentStatus::Focused);
            }
        }
    }
}

//! Aggregation store: one bounded record per student
//!
//! The single source of truth behind the teacher dashboard. All
//! mutation flows through `ingest`, which updates `latest`, appends the
//! derived timeline point, and reclassifies the badge under one map
//! entry lock, so readers never observe a half-updated record.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::aggregate::timeline::Timeline;
use crate::classify::{classify, StudentStatus};
use crate::protocol::{ReportSummary, TelemetryEnvelope, TelemetrySample, TimelinePoint};

/// Everything known about one student since the view mounted
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub student_id: String,
    pub student_name: Option<String>,
    /// Most recently ingested sample; stale arrivals still overwrite
    /// (ordering guarantee is arrival order, not capture order)
    pub latest: TelemetrySample,
    pub timeline: Timeline,
    /// Live badge, reclassified on every ingest
    pub status: StudentStatus,
}

/// Read-only view of one record for rendering
#[derive(Debug, Clone, Serialize)]
pub struct StudentSnapshot {
    pub student_id: String,
    pub student_name: Option<String>,
    pub status: StudentStatus,
    pub status_label: &'static str,
    pub status_color: &'static str,
    pub emotion: String,
    pub gaze: String,
    pub face_count: u32,
    pub confusion_score: Option<f32>,
    pub timeline: Vec<TimelinePoint>,
    /// Summary over the retained window only, computed locally
    pub local_summary: ReportSummary,
}

/// Mapping from student identity to bounded rolling state.
///
/// Created empty when the teacher view mounts, discarded with its
/// connection on unmount; never persisted.
pub struct AggregationStore {
    records: DashMap<String, StudentRecord>,
    timeline_capacity: usize,
    confusion_threshold: f32,
    ingested: AtomicU64,
    ignored: AtomicU64,
}

impl AggregationStore {
    pub fn new(timeline_capacity: usize, confusion_threshold: f32) -> Self {
        Self {
            records: DashMap::new(),
            timeline_capacity,
            confusion_threshold,
            ingested: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
        }
    }

    /// Ingest one envelope.
    ///
    /// `telemetry` envelopes create the record on first sight and then
    /// update it atomically; `init` envelopes never create a record.
    /// Returns whether anything was stored.
    pub fn ingest(&self, envelope: TelemetryEnvelope) -> bool {
        let (student_id, student_name, sample) = match envelope {
            TelemetryEnvelope::Telemetry {
                student_id,
                student_name,
                data,
            } => (student_id, student_name, data),
            TelemetryEnvelope::Init { student_id } => {
                tracing::debug!("Ignoring init envelope from {}", student_id);
                self.ignored.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        let point = TimelinePoint::from_sample(&sample);
        let status = classify(Some(&sample), self.confusion_threshold);

        // The entry guard holds the map shard lock for the whole
        // update, which is what makes the ingest atomic to readers
        let mut record = self
            .records
            .entry(student_id.clone())
            .or_insert_with(|| StudentRecord {
                student_id,
                student_name: None,
                latest: TelemetrySample::default(),
                timeline: Timeline::new(self.timeline_capacity),
                status: StudentStatus::Unknown,
            });

        if let Some(name) = student_name {
            record.student_name = Some(name);
        }
        record.latest = sample;
        record.timeline.push(point);
        record.status = status;
        drop(record);

        self.ingested.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Current view of every student, sorted by id for stable rendering.
    /// Never blocks ingest and never mutates.
    pub fn snapshot(&self) -> Vec<StudentSnapshot> {
        let mut snapshots: Vec<StudentSnapshot> = self
            .records
            .iter()
            .map(|entry| Self::snapshot_record(entry.value(), self.confusion_threshold))
            .collect();
        snapshots.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        snapshots
    }

    /// Full accumulated state for one student, or `None` if never seen
    pub fn get(&self, student_id: &str) -> Option<StudentRecord> {
        self.records.get(student_id).map(|r| r.value().clone())
    }

    /// Snapshot of one student
    pub fn get_snapshot(&self, student_id: &str) -> Option<StudentSnapshot> {
        self.records
            .get(student_id)
            .map(|r| Self::snapshot_record(r.value(), self.confusion_threshold))
    }

    /// Number of distinct students seen
    pub fn student_count(&self) -> usize {
        self.records.len()
    }

    /// Telemetry envelopes stored
    pub fn ingested(&self) -> u64 {
        self.ingested.load(Ordering::Relaxed)
    }

    /// Envelopes ignored (handshakes)
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Configured classification threshold
    pub fn confusion_threshold(&self) -> f32 {
        self.confusion_threshold
    }

    fn snapshot_record(record: &StudentRecord, threshold: f32) -> StudentSnapshot {
        StudentSnapshot {
            student_id: record.student_id.clone(),
            student_name: record.student_name.clone(),
            status: record.status,
            status_label: record.status.label(),
            status_color: record.status.color(),
            emotion: record.latest.emotion.clone(),
            gaze: record.latest.gaze.clone(),
            face_count: record.latest.face_count,
            confusion_score: record.latest.confusion_score,
            timeline: record.timeline.to_vec(),
            local_summary: record.timeline.summarize(threshold),
        }
    }
}

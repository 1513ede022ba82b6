//! Bounded rolling timeline of engagement points
//!
//! Capacity-bounded FIFO: insertion order is arrival order, the oldest
//! point is evicted on overflow, and nothing ever reorders.

use std::collections::VecDeque;

use crate::classify::{classify_point, StudentStatus};
use crate::protocol::{ReportSummary, TimelinePoint};

/// Bounded ordered sequence of timeline points
#[derive(Debug, Clone)]
pub struct Timeline {
    points: VecDeque<TimelinePoint>,
    capacity: usize,
}

impl Timeline {
    /// Create a timeline holding at most `capacity` points
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest if at capacity
    pub fn push(&mut self, point: TimelinePoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Points in arrival order, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &TimelinePoint> {
        self.points.iter()
    }

    /// Owned copy of the points in arrival order
    pub fn to_vec(&self) -> Vec<TimelinePoint> {
        self.points.iter().cloned().collect()
    }

    /// Local engagement summary over the retained window.
    ///
    /// Mirrors the report service's percentages but is computed from
    /// the in-memory history only; it backs the dashboard when the
    /// report service is unreachable and is always labeled as local.
    pub fn summarize(&self, threshold: f32) -> ReportSummary {
        if self.points.is_empty() {
            return ReportSummary::default();
        }

        let total = self.points.len() as f32;
        let mut confused = 0u32;
        let mut happy = 0u32;
        let mut focused = 0u32;

        for point in &self.points {
            match classify_point(point, threshold) {
                StudentStatus::Confused => confused += 1,
                StudentStatus::Engaged => happy += 1,
                StudentStatus::Focused => focused += 1,
                _ => {}
            }
        }

        let pct = |n: u32| ((n as f32 / total) * 100.0).round() as u32;
        ReportSummary {
            confused_pct: pct(confused),
            happy_pct: pct(happy),
            focused_pct: pct(focused),
        }
    }
}

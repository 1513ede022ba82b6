//! Latest-frame buffer between the capture thread and the send loop
//!
//! The send cadence is time-triggered, not ack-triggered: a tick that
//! finds no frame is skipped and a frame that is never picked up is
//! overwritten. Nothing queues, so memory stays bounded no matter how
//! the transport behaves.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One raw frame as produced by a video device (tightly packed RGB8)
#[derive(Clone)]
pub struct VideoFrame {
    /// Interleaved RGB8 pixel data, row-major
    pub pixels: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Capture timestamp, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u32) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp_ms: Utc::now().timestamp_millis(),
            sequence,
        }
    }

    /// A frame the device has not really produced yet; never encoded,
    /// never sent
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// Expected pixel buffer length for the stated dimensions
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Single-slot latest-value buffer for frames
pub struct FrameSlot {
    slot: Mutex<Option<VideoFrame>>,
    published: AtomicUsize,
    overwritten: AtomicUsize,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            published: AtomicUsize::new(0),
            overwritten: AtomicUsize::new(0),
        }
    }

    /// Publish a frame, replacing any frame the sender has not yet taken
    pub fn publish(&self, frame: VideoFrame) {
        let mut slot = self.slot.lock();
        if slot.replace(frame).is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the latest frame, leaving the slot empty
    pub fn take(&self) -> Option<VideoFrame> {
        self.slot.lock().take()
    }

    /// Whether a frame is currently waiting
    pub fn is_ready(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Total frames published
    pub fn published(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames replaced before being taken
    pub fn overwritten(&self) -> usize {
        self.overwritten.load(Ordering::Relaxed)
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to a frame slot
pub type SharedFrameSlot = Arc<FrameSlot>;

/// Create a new shared frame slot
pub fn create_shared_slot() -> SharedFrameSlot {
    Arc::new(FrameSlot::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: u32) -> VideoFrame {
        VideoFrame::new(vec![0u8; 12], 2, 2, seq)
    }

    #[test]
    fn test_slot_holds_only_newest() {
        let slot = FrameSlot::new();
        slot.publish(frame(0));
        slot.publish(frame(1));
        slot.publish(frame(2));

        let taken = slot.take().unwrap();
        assert_eq!(taken.sequence, 2);
        assert!(slot.take().is_none());
        assert_eq!(slot.published(), 3);
        assert_eq!(slot.overwritten(), 2);
    }

    #[test]
    fn test_take_empties_slot() {
        let slot = FrameSlot::new();
        assert!(slot.take().is_none());
        slot.publish(frame(7));
        assert!(slot.is_ready());
        assert_eq!(slot.take().unwrap().sequence, 7);
        assert!(!slot.is_ready());
    }

    #[test]
    fn test_empty_frame_detection() {
        let zero = VideoFrame::new(Vec::new(), 0, 0, 0);
        assert!(zero.is_empty());

        let real = frame(0);
        assert!(!real.is_empty());
        assert_eq!(real.expected_len(), 12);
    }
}

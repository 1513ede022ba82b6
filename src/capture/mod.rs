//! Video capture subsystem: device seam, frame buffer, capture thread

pub mod frame;
pub mod source;
pub mod worker;

pub use frame::{create_shared_slot, FrameSlot, SharedFrameSlot, VideoFrame};
pub use source::{FrameSource, SourceInfo, SyntheticSource};
pub use worker::FrameCapture;

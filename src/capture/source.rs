//! Frame source abstraction
//!
//! `FrameSource` is the seam between the capture worker and whatever
//! actually produces pixels: a webcam wrapper, a screen grabber, or the
//! synthetic generator used for development and load testing. The
//! worker never talks to a device API directly.

use crate::capture::frame::VideoFrame;
use crate::error::CaptureError;

/// Static description of a video source
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// A live video input device producing raw frames on demand.
///
/// `open` performs the device-permission handshake and is the only
/// place a fatal `DeviceAccess` error can originate. `grab` returns
/// `Ok(None)` while the device has not produced a frame yet; transient
/// grab failures are recoverable.
pub trait FrameSource: Send {
    /// Acquire the device. Must be called before `grab`.
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Pull the next frame if one is available
    fn grab(&mut self) -> Result<Option<VideoFrame>, CaptureError>;

    /// Describe this source
    fn info(&self) -> SourceInfo;
}

/// Deterministic test-pattern source: a gradient that shifts every
/// frame so consecutive frames differ. Stands in for a camera wherever
/// one is unavailable.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    sequence: u32,
    opened: bool,
    /// Frames to withhold before the first real one, simulating device
    /// warm-up
    warmup_frames: u32,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: 0,
            opened: false,
            warmup_frames: 0,
        }
    }

    /// Synthetic source that yields nothing for the first `frames`
    /// grabs after opening
    pub fn with_warmup(width: u32, height: u32, frames: u32) -> Self {
        Self {
            warmup_frames: frames,
            ..Self::new(width, height)
        }
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> Result<(), CaptureError> {
        self.opened = true;
        Ok(())
    }

    fn grab(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        if !self.opened {
            return Err(CaptureError::SourceClosed);
        }
        if self.warmup_frames > 0 {
            self.warmup_frames -= 1;
            return Ok(None);
        }

        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        let mut pixels = Vec::with_capacity((self.width * self.height * 3) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.push(((x + seq) % 256) as u8);
                pixels.push(((y + seq) % 256) as u8);
                pixels.push((seq % 256) as u8);
            }
        }

        Ok(Some(VideoFrame::new(pixels, self.width, self.height, seq)))
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "synthetic".to_string(),
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grab_before_open_fails() {
        let mut source = SyntheticSource::new(4, 4);
        assert!(source.grab().is_err());
    }

    #[test]
    fn test_synthetic_frames_advance() {
        let mut source = SyntheticSource::new(4, 4);
        source.open().unwrap();

        let a = source.grab().unwrap().unwrap();
        let b = source.grab().unwrap().unwrap();
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
        assert_eq!(a.pixels.len(), a.expected_len());
        assert_ne!(a.pixels, b.pixels);
    }

    #[test]
    fn test_warmup_withholds_frames() {
        let mut source = SyntheticSource::with_warmup(4, 4, 2);
        source.open().unwrap();
        assert!(source.grab().unwrap().is_none());
        assert!(source.grab().unwrap().is_none());
        assert!(source.grab().unwrap().is_some());
    }
}

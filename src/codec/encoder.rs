//! JPEG frame encoder
//!
//! Turns a raw RGB frame into the base64 data-URL payload the ingestion
//! endpoint expects. Encoding is a bounded synchronous operation sized
//! by the (effectively fixed) device resolution, so it runs inline on
//! the send tick.

use base64::Engine;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::capture::frame::VideoFrame;
use crate::error::CodecError;

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Frame encoder with reusable output buffer and running statistics
pub struct FrameEncoder {
    /// JPEG quality, 1-100
    quality: u8,
    /// Encoding buffer (reused to avoid allocations)
    encode_buffer: Vec<u8>,
    /// Frame counter for statistics
    frames_encoded: u64,
    /// Total compressed bytes produced
    bytes_produced: u64,
}

impl FrameEncoder {
    /// Create a new encoder with the specified JPEG quality
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            encode_buffer: Vec::with_capacity(64 * 1024),
            frames_encoded: 0,
            bytes_produced: 0,
        }
    }

    /// Encode a frame to raw JPEG bytes
    pub fn encode_jpeg(&mut self, frame: &VideoFrame) -> Result<Bytes, CodecError> {
        if frame.is_empty() {
            return Err(CodecError::EmptyFrame);
        }
        if frame.pixels.len() != frame.expected_len() {
            return Err(CodecError::BufferMismatch {
                got: frame.pixels.len(),
                width: frame.width,
                height: frame.height,
            });
        }

        self.encode_buffer.clear();
        JpegEncoder::new_with_quality(&mut self.encode_buffer, self.quality)
            .encode(
                &frame.pixels,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

        self.frames_encoded += 1;
        self.bytes_produced += self.encode_buffer.len() as u64;

        Ok(Bytes::copy_from_slice(&self.encode_buffer))
    }

    /// Encode a frame to the `data:image/jpeg;base64,...` payload
    /// carried on the wire
    pub fn encode_payload(&mut self, frame: &VideoFrame) -> Result<String, CodecError> {
        let jpeg = self.encode_jpeg(frame)?;
        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg)))
    }

    /// Current JPEG quality
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Update quality dynamically
    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality.clamp(1, 100);
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.frames_encoded = 0;
        self.bytes_produced = 0;
    }
}

/// Encoder statistics
#[derive(Debug, Clone)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f32,
}

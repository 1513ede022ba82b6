//! Frame codec
//!
//! Converts raw captured frames into the compact payload carried
//! inside telemetry envelopes.

pub mod encoder;

pub use encoder::{EncoderStats, FrameEncoder};

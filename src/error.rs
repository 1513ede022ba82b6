//! Error types for the telemetry streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Frame capture errors
///
/// `DeviceAccess` is the only fatal variant: without camera permission
/// the whole capture flow is dead and no network attempt should follow.
/// Everything else is transient.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Video device access denied: {0}")]
    DeviceAccess(String),

    #[error("Frame source is closed")]
    SourceClosed,

    #[error("Frame grab failed: {0}")]
    Grab(String),
}

impl CaptureError {
    /// Whether this error should abort the capture flow entirely
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::DeviceAccess(_))
    }
}

/// Frame encoding errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame has zero dimensions")]
    EmptyFrame,

    #[error("Frame buffer length {got} does not match {width}x{height} RGB")]
    BufferMismatch { got: usize, width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Transport errors
///
/// Never fatal from the link's perspective; every variant feeds the
/// fixed-interval reconnect loop.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Connection closed by peer")]
    Closed,
}

/// Inbound envelope decode errors; malformed frames are dropped,
/// the connection is unaffected
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("Unexpected binary frame ({0} bytes)")]
    UnexpectedBinary(usize),
}

/// Identity service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Wrong role: expected {expected}, got {actual}")]
    WrongRole { expected: String, actual: String },

    #[error("Identity request failed: {0}")]
    RequestFailed(String),
}

/// Report service errors; surfaced once, never retried automatically
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Report service returned status {0}")]
    BadStatus(u16),

    #[error("Report request failed: {0}")]
    RequestFailed(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

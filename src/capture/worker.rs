//! Frame capture worker
//!
//! Runs one frame source on its own dedicated thread at device pace,
//! publishing every grabbed frame into the shared latest-frame slot.
//! The send loop pulls from the slot on its own cadence; the two sides
//! never block each other.

use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::frame::SharedFrameSlot;
use crate::capture::source::FrameSource;
use crate::error::CaptureError;

/// Capture instance for a single video source
pub struct FrameCapture {
    /// Source, present until the capture thread takes ownership
    source: Option<Box<dyn FrameSource>>,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Destination slot for grabbed frames
    slot: SharedFrameSlot,

    /// Grab interval (device pace)
    interval: Duration,

    /// Capture thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for transient capture errors
    error_rx: Option<Receiver<CaptureError>>,

    /// Total frames captured
    frames_captured: Arc<AtomicU64>,
}

impl FrameCapture {
    pub fn new(source: Box<dyn FrameSource>, slot: SharedFrameSlot, interval: Duration) -> Self {
        Self {
            source: Some(source),
            running: Arc::new(AtomicBool::new(false)),
            slot,
            interval,
            thread_handle: None,
            error_rx: None,
            frames_captured: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open the device and start the capture thread.
    ///
    /// A `DeviceAccess` failure surfaces here, synchronously, before
    /// anything is spawned; callers must not attempt any network
    /// connection after it.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut source = self.source.take().ok_or(CaptureError::SourceClosed)?;
        if let Err(e) = source.open() {
            // Put the source back so a later start can retry a
            // non-fatal failure
            self.source = Some(source);
            return Err(e);
        }

        let info = source.info();
        tracing::info!(
            "Capture starting on {} ({}x{})",
            info.name,
            info.width,
            info.height
        );

        let (error_tx, error_rx) = bounded::<CaptureError>(16);
        self.error_rx = Some(error_rx);
        self.frames_captured.store(0, Ordering::SeqCst);

        let running = self.running.clone();
        let slot = self.slot.clone();
        let interval = self.interval;
        let frames_captured = self.frames_captured.clone();

        running.store(true, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("frame-capture".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    match source.grab() {
                        Ok(Some(frame)) => {
                            if !frame.is_empty() {
                                frames_captured.fetch_add(1, Ordering::Relaxed);
                                slot.publish(frame);
                            }
                        }
                        Ok(None) => {}
                        Err(e) if e.is_fatal() => {
                            tracing::error!("Fatal capture error: {}", e);
                            let _ = error_tx.try_send(e);
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                        Err(e) => {
                            tracing::warn!("Transient capture error: {}", e);
                            let _ = error_tx.try_send(e);
                        }
                    }
                    thread::sleep(interval);
                }
            })
            .map_err(|e| CaptureError::Grab(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing. Safe to call multiple times.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Total frames captured since start
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured.load(Ordering::Relaxed)
    }

    /// Check for errors from the capture thread
    pub fn check_errors(&self) -> Option<CaptureError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for FrameCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

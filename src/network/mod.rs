//! Network subsystem: resilient persistent connections for telemetry
//!
//! Both sides follow the same connection state machine:
//! `Connecting -> Open -> (Reconnecting <-> Connecting) -> Closed`,
//! with errors folding into `Reconnecting`. Transport faults are
//! recovered locally on a fixed interval and never surface as fatal.

pub mod bus;
pub mod link;

pub use bus::TelemetryBus;
pub use link::{StudentIdentity, TelemetryLink};

use parking_lot::Mutex;
use std::sync::Arc;

use crate::protocol::ConnectionState;

/// Shared handle to one connection's state, readable by the UI while
/// the owning task drives transitions
pub type SharedConnectionState = Arc<Mutex<ConnectionState>>;

/// Fresh state handle, starting out closed
pub fn new_shared_state() -> SharedConnectionState {
    Arc::new(Mutex::new(ConnectionState::Closed))
}

pub(crate) fn set_state(state: &SharedConnectionState, next: ConnectionState) {
    *state.lock() = next;
}

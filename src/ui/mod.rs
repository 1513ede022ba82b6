//! Teacher console HTTP surface
//!
//! JSON endpoints the dashboard renders from; page composition and
//! styling live elsewhere.

pub mod handlers;
pub mod server;

pub use server::{AppState, WebServer};

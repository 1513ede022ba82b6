//! Teacher-side aggregation: bounded per-student history and the live
//! snapshot rendered by the dashboard

pub mod store;
pub mod timeline;

pub use store::{AggregationStore, StudentRecord, StudentSnapshot};
pub use timeline::Timeline;

//! Status store for the zbstat live feed.
//!
//! Keeps the per-key progress counters and the connection flag that a
//! status bar renders. Written by the connection manager, read by any
//! number of consumers.

pub mod status_store;
pub mod types;

pub use status_store::{StatusSink, StatusStore};
pub use types::{SeedItem, StatusSnapshot, TrackedItem};

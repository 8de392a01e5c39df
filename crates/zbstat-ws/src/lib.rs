//! WebSocket client for the zbstat status feed.
//!
//! Keeps one connection to the local status server alive:
//! - Decodes `{game, curr, max}` frames into the status store
//! - Discards `details` frames and malformed payloads
//! - Reconnects after a fixed 5s delay, forever, until shut down

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, ConnectionStats, DEFAULT_URL,
    RECONNECT_DELAY,
};
pub use error::{WsError, WsResult};
pub use message::{InboundMessage, StatusUpdate};

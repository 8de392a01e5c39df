//! zbstat: live status feed client.
//!
//! Wires the components together:
//! - Configuration (TOML file, CLI overrides)
//! - Status store seeded with the tracked keys
//! - WebSocket connection manager with fixed-delay reconnect
//! - Terminal status line for the published state

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};

//! Integration test support for zbstat-ws.

pub mod common;

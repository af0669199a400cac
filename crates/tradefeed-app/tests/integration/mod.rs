//! Integration tests for tradefeed-app.
//!
//! These tests run the application against a local WebSocket server:
//! - Join and subscribe frames on open
//! - Frames reaching the stores and the tracker policy
//! - Prerequisites and shutdown

pub mod common;

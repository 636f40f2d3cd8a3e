//! # plotrelay-server
//!
//! The relay server: admits providers and observers over WebSocket and hands
//! them to the hub.
//!
//! The `relay` binary wires these modules together; they are exposed as a
//! library so the server can be embedded and driven from integration tests.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{app, run_server, serve, AppState};

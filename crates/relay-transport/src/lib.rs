//! # plotrelay-transport
//!
//! Transport abstraction layer for the plot relay.
//!
//! The hub only ever needs three things from a connection: receive the next
//! message, send a message, and close. Every transport here implements the
//! [`Connection`] trait so the hub stays protocol-agnostic:
//!
//! - **WebSocket** - client and server streams over `tokio-tungstenite`
//! - **Axum** - the server-side socket produced by an axum upgrade
//! - **Memory** - an in-process pair, used for tests and benchmarks
//!
//! ```rust,ignore
//! use plotrelay_transport::Connection;
//!
//! async fn drain(mut conn: Box<dyn Connection>) {
//!     while let Ok(Some(message)) = conn.recv().await {
//!         // Forward message
//!     }
//! }
//! ```

pub mod memory;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "axum")]
pub mod axum_ws;

pub use traits::{Connection, TransportError, DEFAULT_MAX_MESSAGE_SIZE};

#[cfg(feature = "websocket")]
pub use websocket::{connect, WebSocketConnection};

#[cfg(feature = "axum")]
pub use axum_ws::AxumConnection;

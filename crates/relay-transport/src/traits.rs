//! Transport abstraction traits for the relay.
//!
//! These traits define the interface that all transport implementations must provide,
//! allowing the hub to be transport-agnostic.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Default maximum inbound message size (16 MiB), the largest envelope a
/// publisher will encode.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection attempt timed out.
    #[error("Connection timed out")]
    Timeout,

    /// Connection attempt or handshake failed.
    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    /// Failed to send data.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Failed to receive data.
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// Inbound message exceeds the configured limit.
    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),
}

/// An active duplex connection.
///
/// A connection carries whole messages as opaque bytes. It is owned by
/// exactly one task at a time: an ingestion loop for providers, the hub
/// event loop for observers.
#[async_trait]
pub trait Connection: Send {
    /// Receive the next message.
    ///
    /// Returns `None` if the connection is closed cleanly.
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Send a message.
    async fn send(&mut self, data: Bytes) -> Result<(), TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Get the remote address of the connection, if available.
    fn remote_addr(&self) -> Option<String> {
        None
    }

    /// Check if the connection is still open.
    fn is_open(&self) -> bool;
}

/// Split an outbound payload into text (valid UTF-8) or binary.
pub(crate) fn text_or_binary(data: Bytes) -> Result<String, Vec<u8>> {
    String::from_utf8(Vec::from(data)).map_err(|e| e.into_bytes())
}

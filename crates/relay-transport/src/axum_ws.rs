//! Adapter for sockets produced by an axum WebSocket upgrade.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::traits::{text_or_binary, Connection, TransportError};

/// A server-side connection accepted through axum.
pub struct AxumConnection {
    socket: WebSocket,
    remote_addr: Option<String>,
    is_open: bool,
    max_message_size: usize,
}

impl AxumConnection {
    /// Wrap an upgraded socket.
    #[must_use]
    pub fn new(socket: WebSocket, max_message_size: usize) -> Self {
        Self {
            socket,
            remote_addr: None,
            is_open: true,
            max_message_size,
        }
    }

    /// Attach the peer address for logging.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    fn accept_payload(&self, data: Vec<u8>) -> Result<Option<Bytes>, TransportError> {
        if data.len() > self.max_message_size {
            warn!(
                "Message too large: {} bytes (max: {})",
                data.len(),
                self.max_message_size
            );
            return Err(TransportError::MessageTooLarge(data.len()));
        }
        Ok(Some(Bytes::from(data)))
    }
}

#[async_trait]
impl Connection for AxumConnection {
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Binary(data))) => return self.accept_payload(data),
                Some(Ok(Message::Text(text))) => return self.accept_payload(text.into_bytes()),
                // axum answers pings on our behalf
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.is_open = false;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    debug!("WebSocket stream ended");
                    self.is_open = false;
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&mut self, data: Bytes) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::ConnectionClosed);
        }

        let message = match text_or_binary(data) {
            Ok(text) => Message::Text(text),
            Err(binary) => Message::Binary(binary),
        };

        self.socket.send(message).await.map_err(|e| {
            self.is_open = false;
            TransportError::SendFailed(e.to_string())
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !std::mem::replace(&mut self.is_open, false) {
            return Ok(());
        }

        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| TransportError::SendFailed(format!("Failed to close: {}", e)))
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}

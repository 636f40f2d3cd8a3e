//! WebSocket transport implementation.
//!
//! This module provides a WebSocket-based connection using tokio-tungstenite,
//! plus [`connect`] for clients dialing the relay.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, warn};

use crate::traits::{text_or_binary, Connection, TransportError, DEFAULT_MAX_MESSAGE_SIZE};

/// A client connection produced by [`connect`].
pub type ClientConnection = WebSocketConnection<MaybeTlsStream<TcpStream>>;

/// Dial a relay endpoint, giving up after `timeout`.
///
/// Dropping the pending handshake on timeout also drops the socket, so an
/// abandoned attempt never leaves a half-open connection behind.
///
/// # Errors
///
/// Returns [`TransportError::Timeout`] if the handshake does not complete in
/// time and [`TransportError::ConnectFailed`] if it is refused or fails.
pub async fn connect(url: &str, timeout: Duration) -> Result<ClientConnection, TransportError> {
    let (stream, response) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| {
            warn!(url, ?timeout, "WebSocket connect timed out");
            TransportError::Timeout
        })?
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

    debug!(url, status = %response.status(), "WebSocket handshake completed");

    Ok(WebSocketConnection::new(stream, DEFAULT_MAX_MESSAGE_SIZE).with_remote_addr(url))
}

/// A WebSocket connection.
pub struct WebSocketConnection<S> {
    stream: WebSocketStream<S>,
    remote_addr: Option<String>,
    is_open: bool,
    max_message_size: usize,
}

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established WebSocket stream.
    #[must_use]
    pub fn new(stream: WebSocketStream<S>, max_message_size: usize) -> Self {
        Self {
            stream,
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
impl<S> Connection for WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return self.accept_payload(data),
                Some(Ok(Message::Text(text))) => return self.accept_payload(text.into_bytes()),
                // tungstenite queues the pong reply itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    debug!("Received close frame");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    debug!("Connection closed");
                    self.is_open = false;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
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

        self.stream.send(message).await.map_err(|e| {
            self.is_open = false;
            TransportError::SendFailed(e.to_string())
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !std::mem::replace(&mut self.is_open, false) {
            return Ok(()); // Already closed
        }

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::SendFailed(format!("Failed to close: {}", e))),
        }
    }

    fn remote_addr(&self) -> Option<String> {
        self.remote_addr.clone()
    }

    fn is_open(&self) -> bool {
        self.is_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_times_out_on_silent_peer() {
        // Accepts TCP but never answers the HTTP upgrade.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let url = format!("ws://{}/provider", addr);
        let result = connect(&url, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Grab a free port, then release it so nothing listens there.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("ws://{}/provider", addr);
        let result = connect(&url, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
    }
}

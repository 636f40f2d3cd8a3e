//! The publisher client.

use plotrelay_protocol::{actions, codec, Envelope, ProtocolError, PROVIDER_PATH};
use plotrelay_transport::{Connection, TransportError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// How long [`Publisher::connect`] waits for the handshake by default.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Publisher errors.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The relay did not complete the handshake in time.
    #[error("cannot connect to plotting server: timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The relay refused or failed the handshake.
    #[error("cannot connect to plotting server: {0}")]
    Connect(#[source] TransportError),

    /// Writing a message failed.
    #[error("cannot send message to server: {0}")]
    Send(#[source] TransportError),

    /// The envelope or its payload could not be encoded.
    #[error("cannot encode message: {0}")]
    Encode(#[from] ProtocolError),

    /// A plot payload could not be serialized.
    #[error("cannot serialize payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Provider endpoint URL.
    pub url: String,
    /// Display name. Derived from the id when unset or empty.
    pub name: Option<String>,
    /// Upper bound on the connection handshake.
    pub connect_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            url: format!("ws://localhost:8080{}", PROVIDER_PATH),
            name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl PublisherConfig {
    /// Configuration for a specific provider URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// A connected publisher.
pub struct Publisher {
    id: String,
    name: String,
    connection: Box<dyn Connection>,
}

impl Publisher {
    /// Connect to the relay's provider endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::ConnectTimeout`] if the handshake takes
    /// longer than the configured timeout, [`PublisherError::Connect`] if it
    /// fails outright.
    pub async fn connect(config: PublisherConfig) -> Result<Self, PublisherError> {
        let connection = plotrelay_transport::connect(&config.url, config.connect_timeout)
            .await
            .map_err(|e| match e {
                TransportError::Timeout => PublisherError::ConnectTimeout(config.connect_timeout),
                other => PublisherError::Connect(other),
            })?;

        let publisher = Self::with_connection(Box::new(connection), config.name);
        info!(id = %publisher.id, name = %publisher.name, url = %config.url, "Publisher connected");
        Ok(publisher)
    }

    /// Build a publisher over an existing connection.
    #[must_use]
    pub fn with_connection(connection: Box<dyn Connection>, name: Option<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => default_name(&id),
        };
        Self {
            id,
            name,
            connection,
        }
    }

    /// The publisher's unique id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The publisher's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wrap `payload` in an envelope stamped with this publisher's identity.
    #[must_use]
    pub fn envelope(&self, action: &str, payload: impl Into<String>) -> Envelope {
        Envelope::new(self.id.clone(), self.name.clone(), action, payload)
    }

    /// Send one envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or sending fails.
    pub async fn publish(
        &mut self,
        action: &str,
        payload: impl Into<String>,
    ) -> Result<(), PublisherError> {
        let envelope = self.envelope(action, payload);
        let data = codec::encode(&envelope)?;

        debug!(id = %self.id, action, bytes = data.len(), "Publishing");

        self.connection
            .send(data)
            .await
            .map_err(PublisherError::Send)
    }

    /// Serialize `series` to JSON and publish it as a `plot` action.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or sending fails.
    pub async fn plot<T: Serialize + ?Sized>(&mut self, series: &T) -> Result<(), PublisherError> {
        let payload = serde_json::to_string(series)?;
        self.publish(actions::PLOT, payload).await
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake cannot be sent.
    pub async fn close(mut self) -> Result<(), PublisherError> {
        self.connection.close().await.map_err(PublisherError::Send)
    }
}

/// First `-`-separated fragment of a UUID string.
fn default_name(id: &str) -> String {
    id.split('-').next().unwrap_or(id).to_string()
}

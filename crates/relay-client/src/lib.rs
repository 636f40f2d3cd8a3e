//! # plotrelay-client
//!
//! Publisher side of the plot relay.
//!
//! A [`Publisher`] dials the relay's provider endpoint once, picks an
//! identity for itself and then sends one [`Envelope`] per call. There is no
//! reconnect or backoff: a failed connect or send is returned to the caller,
//! and the `relay-publish` binary treats either as fatal.
//!
//! ```rust,no_run
//! use plotrelay_client::{Publisher, PublisherConfig};
//!
//! # async fn demo() -> Result<(), plotrelay_client::PublisherError> {
//! let mut publisher = Publisher::connect(PublisherConfig::default().with_name("sine")).await?;
//! publisher.plot(&serde_json::json!({"x": [0.0, 1.0], "y": [0.0, 0.84]})).await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Envelope`]: plotrelay_protocol::Envelope

mod publisher;

pub use publisher::{Publisher, PublisherConfig, PublisherError, DEFAULT_CONNECT_TIMEOUT};

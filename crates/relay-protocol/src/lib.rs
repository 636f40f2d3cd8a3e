//! # plotrelay-protocol
//!
//! Wire definitions shared by the relay server and its clients.
//!
//! The relay itself never looks inside a message: providers send an
//! [`Envelope`] encoded as JSON and the hub forwards the exact bytes to every
//! observer. This crate exists so that publishers and observers agree on the
//! envelope shape and on where the two endpoints live.
//!
//! ## Example
//!
//! ```rust
//! use plotrelay_protocol::{codec, Envelope};
//!
//! let envelope = Envelope::new("9b2c", "9b2c", "plot", r#"{"x":[1,2]}"#);
//! let encoded = codec::encode(&envelope).unwrap();
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(envelope, decoded);
//! ```

pub mod codec;
pub mod envelope;

pub use codec::{decode, encode, ProtocolError, MAX_ENVELOPE_SIZE};
pub use envelope::{actions, Envelope};

/// Path of the endpoint that admits providers.
pub const PROVIDER_PATH: &str = "/provider";

/// Path of the endpoint that admits observers.
pub const OBSERVER_PATH: &str = "/observer";

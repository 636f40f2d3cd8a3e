//! JSON codec for envelopes.
//!
//! Envelopes travel as one WebSocket message each, so no length prefix is
//! needed: a message is exactly one JSON document.

use bytes::Bytes;
use thiserror::Error;

use crate::envelope::Envelope;

/// Maximum encoded envelope size (16 MiB).
pub const MAX_ENVELOPE_SIZE: usize = 16 * 1024 * 1024;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Envelope exceeds maximum size.
    #[error("Envelope size {0} exceeds maximum {MAX_ENVELOPE_SIZE}")]
    TooLarge(usize),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode an envelope to bytes.
///
/// # Errors
///
/// Returns an error if the envelope is too large or encoding fails.
pub fn encode(envelope: &Envelope) -> Result<Bytes, ProtocolError> {
    let data = serde_json::to_vec(envelope)?;

    if data.len() > MAX_ENVELOPE_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }

    Ok(Bytes::from(data))
}

/// Decode an envelope from bytes.
///
/// # Errors
///
/// Returns an error if the data is too large or is not a valid envelope.
pub fn decode(data: &[u8]) -> Result<Envelope, ProtocolError> {
    if data.len() > MAX_ENVELOPE_SIZE {
        return Err(ProtocolError::TooLarge(data.len()));
    }

    Ok(serde_json::from_slice(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_plain_json() {
        let env = Envelope::plot("1", "a", "X");
        let encoded = encode(&env).unwrap();
        assert_eq!(
            &encoded[..],
            br#"{"id":"1","name":"a","action":"plot","payload":"X"}"#
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b"not json"), Err(ProtocolError::Json(_))));
        assert!(matches!(
            decode(br#"{"id":"1"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_too_large() {
        let env = Envelope::plot("1", "a", "x".repeat(MAX_ENVELOPE_SIZE));
        assert!(matches!(encode(&env), Err(ProtocolError::TooLarge(_))));
    }
}

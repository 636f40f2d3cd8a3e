//! Connection identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counter backing [`ConnectionId::next`].
static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an admitted connection.
///
/// Ids are handed out in increasing order and never reused, so a client
/// that reconnects always gets a fresh identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next id.
    #[must_use]
    pub fn next() -> Self {
        Self(ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id.
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// The side of the hub a connection was admitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Originates messages.
    Provider,
    /// Receives every broadcast.
    Observer,
}

impl Role {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Provider => "provider",
            Role::Observer => "observer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_increasing() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let id = ConnectionId::next();
        assert_eq!(id.to_string(), format!("conn_{}", id.as_u64()));
        assert_eq!(Role::Observer.to_string(), "observer");
    }
}

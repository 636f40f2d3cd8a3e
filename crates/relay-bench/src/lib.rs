//! Shared helpers for the relay benchmarks.

use plotrelay_core::Hub;
use plotrelay_transport::memory::{self, MemoryConnection};

/// Register `count` in-memory observers and return their far ends.
///
/// # Panics
///
/// Panics if the hub has stopped.
#[must_use]
pub fn attach_observers(hub: &Hub, count: usize) -> Vec<MemoryConnection> {
    (0..count)
        .map(|_| {
            let (conn, peer) = memory::pair();
            hub.register_observer(Box::new(conn))
                .expect("hub stopped");
            peer
        })
        .collect()
}

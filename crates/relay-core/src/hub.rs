//! The connection hub.
//!
//! A [`Hub`] is a cheap, cloneable handle to a single event loop task. The
//! loop owns the registry outright; every change to it (registration,
//! removal, broadcast pruning) arrives as an event on one unbounded
//! channel and is applied in arrival order, one event at a time.
//!
//! Broadcasts are written to observers sequentially from inside the loop.
//! A slow observer therefore holds up the whole hub for as long as its write
//! takes. [`HubConfig::write_timeout`] bounds that wait when set; by default
//! writes are awaited without a limit.

use crate::id::{ConnectionId, Role};
use crate::ingest;
use crate::metrics;
use crate::registry::{Registry, RegistrySnapshot, Removed};
use bytes::Bytes;
use plotrelay_transport::{Connection, TransportError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

/// Hub errors.
#[derive(Debug, Error)]
pub enum HubError {
    /// The event loop is no longer running.
    #[error("Hub event loop is closed")]
    Closed,
}

/// Hub configuration.
#[derive(Debug, Clone, Default)]
pub struct HubConfig {
    /// Upper bound on a single observer write (and close). An observer that
    /// exceeds it is treated as failed. `None` waits indefinitely.
    pub write_timeout: Option<Duration>,
}

/// A message for the event loop.
pub(crate) enum HubEvent {
    /// Add a provider id. Its transport stays with its ingestion loop.
    RegisterProvider(ConnectionId),
    /// Add an observer and hand its transport to the hub.
    RegisterObserver(ConnectionId, Box<dyn Connection>),
    /// Remove a connection from whichever set holds it.
    RemoveConnection(ConnectionId),
    /// Write a payload to every observer.
    Broadcast(Bytes),
    /// Report current membership.
    Snapshot(oneshot::Sender<RegistrySnapshot>),
}

impl fmt::Debug for HubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubEvent::RegisterProvider(id) => {
                f.debug_tuple("RegisterProvider").field(id).finish()
            }
            HubEvent::RegisterObserver(id, _) => {
                f.debug_tuple("RegisterObserver").field(id).finish()
            }
            HubEvent::RemoveConnection(id) => {
                f.debug_tuple("RemoveConnection").field(id).finish()
            }
            HubEvent::Broadcast(payload) => f
                .debug_struct("Broadcast")
                .field("bytes", &payload.len())
                .finish(),
            HubEvent::Snapshot(_) => f.write_str("Snapshot"),
        }
    }
}

/// Handle to the hub event loop.
///
/// Construct one per process with [`Hub::start`] and share clones of it.
/// The loop runs until every handle and every ingestion loop has gone away.
#[derive(Clone)]
pub struct Hub {
    events: mpsc::UnboundedSender<HubEvent>,
}

impl Hub {
    /// Spawn the event loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(config: HubConfig) -> Self {
        let (events, rx) = mpsc::unbounded_channel();

        info!("Starting hub with config: {:?}", config);

        let event_loop = EventLoop {
            registry: Registry::new(),
            config,
            events: rx,
        };
        tokio::spawn(event_loop.run());

        Self { events }
    }

    /// Register a provider and start its ingestion loop.
    ///
    /// The registration is queued before the ingestion loop is spawned, so
    /// it is always applied ahead of anything the provider sends.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the event loop has stopped.
    pub fn register_provider(
        &self,
        connection: Box<dyn Connection>,
    ) -> Result<ConnectionId, HubError> {
        let id = ConnectionId::next();
        self.submit(HubEvent::RegisterProvider(id))?;
        tokio::spawn(ingest::run(id, connection, self.events.clone()));
        Ok(id)
    }

    /// Register an observer. Observers are write-only; no loop reads them.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the event loop has stopped.
    pub fn register_observer(
        &self,
        connection: Box<dyn Connection>,
    ) -> Result<ConnectionId, HubError> {
        let id = ConnectionId::next();
        self.submit(HubEvent::RegisterObserver(id, connection))?;
        Ok(id)
    }

    /// Queue removal of a connection. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the event loop has stopped.
    pub fn submit_removal(&self, id: ConnectionId) -> Result<(), HubError> {
        self.submit(HubEvent::RemoveConnection(id))
    }

    /// Queue a payload for delivery to every observer.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the event loop has stopped.
    pub fn submit_broadcast(&self, payload: impl Into<Bytes>) -> Result<(), HubError> {
        self.submit(HubEvent::Broadcast(payload.into()))
    }

    /// Ask the event loop for its current membership.
    ///
    /// The answer reflects every event queued before this call.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the event loop has stopped.
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, HubError> {
        let (tx, rx) = oneshot::channel();
        self.submit(HubEvent::Snapshot(tx))?;
        rx.await.map_err(|_| HubError::Closed)
    }

    fn submit(&self, event: HubEvent) -> Result<(), HubError> {
        self.events.send(event).map_err(|_| HubError::Closed)
    }
}

/// The single owner of the registry.
struct EventLoop {
    registry: Registry,
    config: HubConfig,
    events: mpsc::UnboundedReceiver<HubEvent>,
}

impl EventLoop {
    async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle(event).await;
        }

        info!("Hub event loop stopped");
    }

    async fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::RegisterProvider(id) => {
                match self.registry.add_provider(id) {
                    Ok(()) => {
                        info!(connection = %id, "Added provider");
                        metrics::record_admission(Role::Provider);
                    }
                    Err(e) => warn!(error = %e, "Provider registration rejected"),
                }
                self.publish_sizes();
            }

            HubEvent::RegisterObserver(id, connection) => {
                match self.registry.add_observer(id, connection) {
                    Ok(()) => {
                        info!(connection = %id, "Added observer");
                        metrics::record_admission(Role::Observer);
                    }
                    Err(e) => warn!(error = %e, "Observer registration rejected"),
                }
                self.publish_sizes();
            }

            HubEvent::RemoveConnection(id) => {
                self.remove(id).await;
            }

            HubEvent::Broadcast(payload) => {
                self.dispatch(payload).await;
            }

            HubEvent::Snapshot(reply) => {
                let _ = reply.send(self.registry.snapshot());
            }
        }
    }

    /// Remove `id`, closing it if it was an observer.
    async fn remove(&mut self, id: ConnectionId) {
        match self.registry.remove(id) {
            Some(Removed::Provider) => {
                debug!(connection = %id, "Removed provider");
                metrics::record_removal(Role::Provider);
            }
            Some(Removed::Observer(mut connection)) => {
                debug!(connection = %id, "Removed observer");
                metrics::record_removal(Role::Observer);
                close(id, connection.as_mut(), self.config.write_timeout).await;
            }
            None => {
                trace!(connection = %id, "Removal of unknown connection ignored");
            }
        }
        self.publish_sizes();
    }

    /// Write `payload` to every observer, pruning the ones that fail.
    async fn dispatch(&mut self, payload: Bytes) {
        let write_timeout = self.config.write_timeout;
        let mut delivered = 0;
        let mut failed = Vec::new();

        debug!(
            bytes = payload.len(),
            observers = self.registry.observer_count(),
            "Broadcasting message"
        );

        for (id, connection) in self.registry.observers_mut() {
            let result = match write_timeout {
                Some(limit) => tokio::time::timeout(limit, connection.send(payload.clone()))
                    .await
                    .unwrap_or(Err(TransportError::Timeout)),
                None => connection.send(payload.clone()).await,
            };

            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(connection = %id, error = %e, "Error while writing message");
                    metrics::record_error("observer_write");
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            self.remove(id).await;
        }

        metrics::record_broadcast(payload.len(), delivered);
        trace!(recipients = delivered, "Broadcast complete");
    }

    fn publish_sizes(&self) {
        metrics::set_registry_size(
            self.registry.provider_count(),
            self.registry.observer_count(),
        );
    }
}

/// Close an observer transport, bounded by `limit` when set.
async fn close(id: ConnectionId, connection: &mut dyn Connection, limit: Option<Duration>) {
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, connection.close())
            .await
            .unwrap_or(Err(TransportError::Timeout)),
        None => connection.close().await,
    };

    if let Err(e) = result {
        debug!(connection = %id, error = %e, "Close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use plotrelay_transport::memory::{self, MemoryConnection};

    /// An observer whose writes never complete.
    struct Stalled;

    #[async_trait]
    impl Connection for Stalled {
        async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
            std::future::pending().await
        }

        async fn send(&mut self, _data: Bytes) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            std::future::pending().await
        }

        fn is_open(&self) -> bool {
            true
        }
    }

    fn observe(hub: &Hub) -> (ConnectionId, MemoryConnection) {
        let (conn, peer) = memory::pair();
        let id = hub.register_observer(Box::new(conn)).unwrap();
        (id, peer)
    }

    async fn recv(peer: &mut MemoryConnection) -> Bytes {
        tokio::time::timeout(Duration::from_secs(5), peer.recv())
            .await
            .expect("timed out waiting for broadcast")
            .unwrap()
            .expect("connection closed")
    }

    async fn wait_for(hub: &Hub, check: impl Fn(&RegistrySnapshot) -> bool) -> RegistrySnapshot {
        for _ in 0..500 {
            let snapshot = hub.snapshot().await.unwrap();
            if check(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry never reached the expected state");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_observer() {
        let hub = Hub::start(HubConfig::default());
        let (_, mut a) = observe(&hub);
        let (_, mut b) = observe(&hub);
        let (_, mut c) = observe(&hub);

        hub.submit_broadcast(Bytes::from_static(b"P")).unwrap();

        assert_eq!(recv(&mut a).await, "P");
        assert_eq!(recv(&mut b).await, "P");
        assert_eq!(recv(&mut c).await, "P");
    }

    #[tokio::test]
    async fn test_failed_observer_is_pruned() {
        let hub = Hub::start(HubConfig::default());
        let (a_id, mut a) = observe(&hub);
        let (b_id, b) = observe(&hub);
        let (c_id, mut c) = observe(&hub);

        drop(b);
        hub.submit_broadcast(Bytes::from_static(b"first")).unwrap();

        assert_eq!(recv(&mut a).await, "first");
        assert_eq!(recv(&mut c).await, "first");

        let snapshot = hub.snapshot().await.unwrap();
        assert!(snapshot.has_observer(a_id));
        assert!(!snapshot.has_observer(b_id));
        assert!(snapshot.has_observer(c_id));

        hub.submit_broadcast(Bytes::from_static(b"second")).unwrap();
        assert_eq!(recv(&mut a).await, "second");
        assert_eq!(recv(&mut c).await, "second");
        assert_eq!(hub.snapshot().await.unwrap().observers.len(), 2);
    }

    #[tokio::test]
    async fn test_removing_unknown_connection_is_noop() {
        let hub = Hub::start(HubConfig::default());
        let (id, _peer) = observe(&hub);

        hub.submit_removal(ConnectionId::next()).unwrap();
        hub.submit_removal(id).unwrap();
        hub.submit_removal(id).unwrap();

        let snapshot = hub.snapshot().await.unwrap();
        assert!(snapshot.observers.is_empty());
        assert!(snapshot.providers.is_empty());
    }

    #[tokio::test]
    async fn test_removed_observer_is_closed() {
        let hub = Hub::start(HubConfig::default());
        let (id, mut peer) = observe(&hub);

        hub.submit_removal(id).unwrap();

        let closed = tokio::time::timeout(Duration::from_secs(5), peer.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn test_provider_to_observer_end_to_end() {
        let hub = Hub::start(HubConfig::default());

        let (server_end, mut provider) = memory::pair();
        let provider_id = hub.register_provider(Box::new(server_end)).unwrap();
        let (_, mut observer) = observe(&hub);

        let payload = br#"{"action":"plot","payload":"X"}"#;
        provider.send(Bytes::from_static(payload)).await.unwrap();
        assert_eq!(&recv(&mut observer).await[..], &payload[..]);

        let snapshot = hub.snapshot().await.unwrap();
        assert!(snapshot.has_provider(provider_id));
        assert!(!snapshot.has_observer(provider_id));

        drop(provider);
        wait_for(&hub, |s| !s.has_provider(provider_id)).await;
    }

    #[tokio::test]
    async fn test_closed_observer_misses_later_broadcasts() {
        let hub = Hub::start(HubConfig::default());
        let (server_end, mut provider) = memory::pair();
        hub.register_provider(Box::new(server_end)).unwrap();

        let (_, mut o1) = observe(&hub);
        let (o2_id, mut o2) = observe(&hub);

        o2.close().await.unwrap();
        provider.send(Bytes::from_static(b"after-close")).await.unwrap();

        assert_eq!(recv(&mut o1).await, "after-close");
        let snapshot = wait_for(&hub, |s| !s.has_observer(o2_id)).await;
        assert_eq!(snapshot.observers.len(), 1);
    }

    #[tokio::test]
    async fn test_write_timeout_prunes_stalled_observer() {
        let hub = Hub::start(HubConfig {
            write_timeout: Some(Duration::from_millis(50)),
        });
        let stalled = hub.register_observer(Box::new(Stalled)).unwrap();
        let (healthy, mut peer) = observe(&hub);

        hub.submit_broadcast(Bytes::from_static(b"tick")).unwrap();
        assert_eq!(recv(&mut peer).await, "tick");

        let snapshot = hub.snapshot().await.unwrap();
        assert!(!snapshot.has_observer(stalled));
        assert!(snapshot.has_observer(healthy));
    }

    #[tokio::test]
    async fn test_handles_report_closed_hub() {
        let (events, rx) = mpsc::unbounded_channel();
        drop(rx);
        let hub = Hub { events };

        assert!(matches!(
            hub.submit_broadcast(Bytes::from_static(b"x")),
            Err(HubError::Closed)
        ));
        assert!(matches!(hub.snapshot().await, Err(HubError::Closed)));
    }
}

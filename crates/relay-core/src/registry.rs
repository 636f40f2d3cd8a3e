//! The provider and observer sets owned by the hub.
//!
//! A `Registry` is plain state with no interior locking. It lives inside
//! the hub event loop and is only ever touched from there.

use crate::id::{ConnectionId, Role};
use plotrelay_transport::Connection;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is already present in one of the sets.
    #[error("Connection already registered as {1}: {0}")]
    AlreadyRegistered(ConnectionId, Role),
}

/// A connection taken out of the registry.
pub(crate) enum Removed {
    /// A provider. Its transport is owned by its ingestion loop.
    Provider,
    /// An observer, handed back so the caller can close it.
    Observer(Box<dyn Connection>),
}

/// Live provider and observer connections.
///
/// Invariant: an id is in at most one of the two sets.
#[derive(Default)]
pub(crate) struct Registry {
    providers: HashSet<ConnectionId>,
    observers: HashMap<ConnectionId, Box<dyn Connection>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Which set, if any, holds `id`.
    #[must_use]
    pub fn role_of(&self, id: ConnectionId) -> Option<Role> {
        if self.providers.contains(&id) {
            Some(Role::Provider)
        } else if self.observers.contains_key(&id) {
            Some(Role::Observer)
        } else {
            None
        }
    }

    /// Insert a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is already in either set.
    pub fn add_provider(&mut self, id: ConnectionId) -> Result<(), RegistryError> {
        if let Some(role) = self.role_of(id) {
            return Err(RegistryError::AlreadyRegistered(id, role));
        }
        self.providers.insert(id);
        Ok(())
    }

    /// Insert an observer together with the transport the hub writes to.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is already in either set. The rejected
    /// connection is dropped.
    pub fn add_observer(
        &mut self,
        id: ConnectionId,
        connection: Box<dyn Connection>,
    ) -> Result<(), RegistryError> {
        if let Some(role) = self.role_of(id) {
            return Err(RegistryError::AlreadyRegistered(id, role));
        }
        self.observers.insert(id, connection);
        Ok(())
    }

    /// Remove `id` from whichever set holds it.
    ///
    /// Removing an absent id is a no-op and returns `None`.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Removed> {
        if self.providers.remove(&id) {
            return Some(Removed::Provider);
        }
        self.observers.remove(&id).map(Removed::Observer)
    }

    /// Mutable access to every observer transport, for dispatch.
    pub fn observers_mut(
        &mut self,
    ) -> impl Iterator<Item = (&ConnectionId, &mut Box<dyn Connection>)> {
        self.observers.iter_mut()
    }

    /// Number of providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Number of observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Copy out the current membership.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut providers: Vec<_> = self.providers.iter().copied().collect();
        let mut observers: Vec<_> = self.observers.keys().copied().collect();
        providers.sort_unstable();
        observers.sort_unstable();
        RegistrySnapshot {
            providers,
            observers,
        }
    }
}

/// Point-in-time copy of registry membership, sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrySnapshot {
    /// Provider ids.
    pub providers: Vec<ConnectionId>,
    /// Observer ids.
    pub observers: Vec<ConnectionId>,
}

impl RegistrySnapshot {
    /// Check whether `id` is a registered provider.
    #[must_use]
    pub fn has_provider(&self, id: ConnectionId) -> bool {
        self.providers.binary_search(&id).is_ok()
    }

    /// Check whether `id` is a registered observer.
    #[must_use]
    pub fn has_observer(&self, id: ConnectionId) -> bool {
        self.observers.binary_search(&id).is_ok()
    }
}

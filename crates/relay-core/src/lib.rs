//! # plotrelay-core
//!
//! The connection hub at the center of the plot relay.
//!
//! Providers publish, observers listen, and the hub is the single authority
//! that owns both sets of connections:
//!
//! - **Registry** - the provider and observer sets
//! - **Hub** - a cloneable handle whose only entry points are messages
//! - **Event loop** - the one task that mutates the registry and fans out
//!   broadcasts
//! - **Ingestion** - one task per provider feeding the event loop
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   Broadcast / Remove   ┌────────────┐   send()   ┌────────────┐
//! │ Ingestion  │───────────────────────▶│ Event loop │───────────▶│  Observer  │
//! │ (provider) │                        │ (Registry) │            └────────────┘
//! └────────────┘                        └────────────┘
//!                                             ▲
//!                 register_* / snapshot       │
//!        Hub handle ──────────────────────────┘
//! ```

mod hub;
mod id;
mod ingest;
pub mod metrics;
mod registry;

pub use hub::{Hub, HubConfig, HubError};
pub use id::{ConnectionId, Role};
pub use registry::{RegistryError, RegistrySnapshot};

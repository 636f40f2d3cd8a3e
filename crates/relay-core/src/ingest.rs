//! Per-provider ingestion loop.

use crate::hub::HubEvent;
use crate::id::ConnectionId;
use crate::metrics;
use plotrelay_transport::Connection;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Pull messages from a provider and feed them to the hub.
///
/// Every received message becomes a [`HubEvent::Broadcast`]. When the
/// transport closes or fails, exactly one [`HubEvent::RemoveConnection`] is
/// emitted for `id`, the transport is closed and the loop returns. There is
/// no retry.
pub(crate) async fn run(
    id: ConnectionId,
    mut connection: Box<dyn Connection>,
    events: mpsc::UnboundedSender<HubEvent>,
) {
    debug!(connection = %id, "Waiting for provider messages");

    loop {
        match connection.recv().await {
            Ok(Some(payload)) => {
                trace!(connection = %id, bytes = payload.len(), "Provider message");
                if events.send(HubEvent::Broadcast(payload)).is_err() {
                    warn!(connection = %id, "Hub stopped, dropping provider");
                    break;
                }
            }
            Ok(None) => {
                debug!(connection = %id, "Provider closed");
                break;
            }
            Err(e) => {
                warn!(connection = %id, error = %e, "Provider read failed");
                metrics::record_error("provider_read");
                break;
            }
        }
    }

    let _ = events.send(HubEvent::RemoveConnection(id));

    if let Err(e) = connection.close().await {
        debug!(connection = %id, error = %e, "Provider close failed");
    }
}

//! Background event worker
//!
//! This module provides the task that consumes webhook payloads from the
//! server's channel and applies them through the `EventHandler`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use webhook_server::WebhookPayload;

use crate::handler::EventHandler;

/// Spawns the event worker task
///
/// This worker:
/// - Receives payloads in arrival order, one at a time
/// - Classifies and applies each one before looking at the next
/// - Exits once every sender is gone and the channel is drained
///
/// Being the only consumer, it is also the only writer to the registry, so
/// events for the same device are applied in the order they arrived.
/// The task resolves to the number of payloads it processed.
pub(crate) fn spawn_event_worker(
    mut events: mpsc::UnboundedReceiver<WebhookPayload>,
    handler: Arc<EventHandler>,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        tracing::info!("Event worker started, waiting for events...");
        let mut processed = 0u64;

        while let Some(payload) = events.recv().await {
            tracing::debug!(
                remote_addr = ?payload.remote_addr,
                topic = ?payload.event.get("topic"),
                "Processing webhook event"
            );

            handler.process(&payload.event);
            processed += 1;
        }

        tracing::info!(processed, "Event worker stopped");
        processed
    })
}

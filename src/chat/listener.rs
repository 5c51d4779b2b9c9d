use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::payload::ChatPayload;
use crate::event::{EventSource, MessageEvent};
use crate::queue::Queue;

/// Bridges the event bus into per-room queues
///
/// Reading from the event source and pushing to the queue run as two tasks
/// joined by a bounded channel, so a slow push only stalls the reader once
/// that channel fills up. Delivery to the queue is at-most-once: events
/// that cannot be encoded or pushed are logged and skipped.
pub struct Listener {
    source: Arc<dyn EventSource>,
    queue: Arc<dyn Queue>,
    buffer: usize,
}

impl Listener {
    pub fn new(source: Arc<dyn EventSource>, queue: Arc<dyn Queue>, buffer: usize) -> Self {
        Self {
            source,
            queue,
            buffer,
        }
    }

    /// Spawns the listener; it runs until the event source returns
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consumes the event source until it returns, then drains buffered events
    pub async fn run(self, shutdown: CancellationToken) {
        let source_name = self.source.source_name();
        let (events_tx, events_rx) = mpsc::channel(self.buffer);

        info!(source = source_name, buffer = self.buffer, "Listener started");

        let pusher = tokio::spawn(push_events(self.queue.clone(), events_rx));

        match self.source.receive(shutdown, events_tx).await {
            Ok(()) => info!(source = source_name, "Event source finished"),
            Err(e) => error!(source = source_name, error = %e, "Event source failed"),
        }

        if let Err(e) = pusher.await {
            error!(error = %e, "Listener push task aborted");
        }

        info!(source = source_name, "Listener stopped");
    }
}

async fn push_events(queue: Arc<dyn Queue>, mut events: mpsc::Receiver<MessageEvent>) {
    while let Some(event) = events.recv().await {
        let payload = match ChatPayload::encode(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    room_id = %event.room_id,
                    message_id = %event.id,
                    error = %e,
                    "Dropping message that could not be encoded"
                );
                continue;
            }
        };

        match queue.push(&event.room_id, payload).await {
            Ok(()) => {
                debug!(room_id = %event.room_id, message_id = %event.id, "Message queued");
            }
            Err(e) => {
                warn!(
                    room_id = %event.room_id,
                    message_id = %event.id,
                    error = %e,
                    "Failed to queue message, dropping"
                );
            }
        }
    }
}

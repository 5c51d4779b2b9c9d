use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::events::MessageEvent;
use super::source::{EventSource, EventSourceError};

/// In-process event bus for publishing chat messages
///
/// Publishers call `publish`; the listener consumes the stream through the
/// `EventSource` implementation. Events published while nobody is receiving
/// are dropped.
#[derive(Debug, Clone)]
pub struct BusEventSource {
    sender: broadcast::Sender<MessageEvent>,
}

impl BusEventSource {
    /// Creates a new event bus with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes a message event to every active receiver
    pub fn publish(&self, event: MessageEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Message event published");
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(
                    room_id = %event.room_id,
                    "Message event published with no receivers"
                );
            }
        }
    }

    /// Number of active receivers on the bus
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BusEventSource {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl EventSource for BusEventSource {
    #[instrument(skip_all)]
    async fn receive(
        &self,
        shutdown: CancellationToken,
        events: mpsc::Sender<MessageEvent>,
    ) -> Result<(), EventSourceError> {
        let mut receiver = self.sender.subscribe();
        info!("Receiving message events from bus");

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                received = receiver.recv() => received,
            };

            match event {
                Ok(event) => {
                    let forwarded = tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        sent = events.send(event) => sent,
                    };
                    if forwarded.is_err() {
                        return Err(EventSourceError::ConsumerGone);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Event bus receiver lagged, messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(EventSourceError::Closed);
                }
            }
        }
    }

    fn source_name(&self) -> &'static str {
        "BusEventSource"
    }
}

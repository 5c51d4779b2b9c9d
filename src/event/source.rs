use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::MessageEvent;

/// Errors that end an event source stream
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error("Event stream closed")]
    Closed,

    #[error("Event consumer went away")]
    ConsumerGone,

    #[error("Event source failed: {0}")]
    Fatal(String),
}

/// Trait for event buses that stream message events
///
/// `receive` streams decoded events into `events` until `shutdown` is
/// cancelled (returns `Ok`) or an unrecoverable error occurs (returns
/// `Err`). It is called once and is not restarted.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn receive(
        &self,
        shutdown: CancellationToken,
        events: mpsc::Sender<MessageEvent>,
    ) -> Result<(), EventSourceError>;

    /// Get a human-readable name for this source (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by queue operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueueError {
    /// No payload is waiting under the key; callers should retry later
    #[error("Queue is empty")]
    Empty,

    #[error("Queue backend error: {0}")]
    Backend(String),
}

impl QueueError {
    /// Whether this error only signals that there is nothing to pop
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueError::Empty)
    }
}

/// Trait for per-key FIFO byte queues
///
/// `pop` never blocks waiting for data: an empty key yields
/// `QueueError::Empty`. Implementations must be safe for concurrent use.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Appends a payload to the tail of the queue stored under `key`
    async fn push(&self, key: &str, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Removes and returns the payload at the head of the queue under `key`
    async fn pop(&self, key: &str) -> Result<Vec<u8>, QueueError>;
}

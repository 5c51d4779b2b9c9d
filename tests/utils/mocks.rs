use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use roomcast::{InMemoryQueue, MessageEvent, MessageSender, Queue, QueueError};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Queue wrapper that records every successful push by key
#[derive(Clone, Default)]
pub struct RecordingQueue {
    inner: Arc<InMemoryQueue>,
    pushed: Arc<Mutex<Vec<String>>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys pushed so far, in push order
    pub fn pushed_keys(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }

    /// Payloads still waiting under `key`
    pub fn len(&self, key: &str) -> usize {
        self.inner.len(key)
    }
}

#[async_trait]
impl Queue for RecordingQueue {
    async fn push(&self, key: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        self.inner.push(key, payload).await?;
        self.pushed.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Vec<u8>, QueueError> {
        self.inner.pop(key).await
    }
}

pub fn message(room_id: &str, sender_name: &str, text: &str) -> MessageEvent {
    MessageEvent::new(room_id, MessageSender::new("user-1", sender_name), text)
}

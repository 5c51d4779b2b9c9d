use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use super::store::{Queue, QueueError};

/// In-memory implementation of Queue for development and testing
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    /// Creates a new empty in-memory queue
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Number of payloads waiting under `key`
    pub fn len(&self, key: &str) -> usize {
        self.lock()
            .map(|queues| queues.get(key).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    /// Whether no payloads are waiting under `key`
    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, VecDeque<Vec<u8>>>>, QueueError> {
        self.queues
            .lock()
            .map_err(|_| QueueError::Backend("queue lock poisoned".to_string()))
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn push(&self, key: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let mut queues = self.lock()?;
        let queue = queues.entry(key.to_string()).or_default();
        queue.push_back(payload);

        debug!(key = %key, depth = queue.len(), "Payload pushed to memory queue");
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Vec<u8>, QueueError> {
        let mut queues = self.lock()?;
        let queue = queues.get_mut(key).ok_or(QueueError::Empty)?;
        let payload = queue.pop_front().ok_or(QueueError::Empty)?;

        // Drained rooms leave no entry behind
        if queue.is_empty() {
            queues.remove(key);
        }
        Ok(payload)
    }
}

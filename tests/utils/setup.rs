use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use roomcast::{BusEventSource, ChatConfig, ChatCoordinator, ChatPayload, Queue};

use super::mocks::RecordingQueue;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub coordinator: ChatCoordinator,
    pub queue: RecordingQueue,
    pub bus: BusEventSource,
    pub shutdown: CancellationToken,
}

pub struct TestSetupBuilder {
    config: ChatConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            config: ChatConfig::default().with_poll_interval(Duration::from_millis(5)),
        }
    }

    pub fn with_delivery_buffer(mut self, capacity: usize) -> Self {
        self.config = self.config.with_delivery_buffer(capacity);
        self
    }

    pub async fn build(self) -> TestSetup {
        let queue = RecordingQueue::new();
        let bus = BusEventSource::new(64);
        let shutdown = CancellationToken::new();

        let coordinator = ChatCoordinator::start(
            Arc::new(queue.clone()),
            Arc::new(bus.clone()),
            self.config,
            shutdown.clone(),
        )
        .expect("test config should be valid");

        // The listener subscribes to the bus from its own task
        timeout(Duration::from_secs(1), async {
            while bus.receiver_count() == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("listener should subscribe to the bus");

        TestSetup {
            coordinator,
            queue,
            bus,
            shutdown,
        }
    }
}

impl TestSetup {
    /// Pushes a display payload straight onto a room's queue
    pub async fn push(&self, room_id: &str, text: &str) {
        let payload = ChatPayload {
            sender_name: "tester".to_string(),
            text: text.to_string(),
            created_at: chrono::Utc::now(),
        };
        let bytes = serde_json::to_vec(&payload).unwrap();
        self.queue.push(room_id, bytes).await.unwrap();
    }
}

/// Lets spawned tasks process pending subscriptions
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Receives the next payload text, failing the test after one second
pub async fn next_text(receiver: &mut mpsc::Receiver<Vec<u8>>) -> Option<String> {
    let bytes = timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("timed out waiting for delivery")?;
    Some(ChatPayload::decode(&bytes).unwrap().text)
}

/// Receives the next payload text if one arrives within `wait`
pub async fn try_next_text(
    receiver: &mut mpsc::Receiver<Vec<u8>>,
    wait: Duration,
) -> Option<String> {
    let bytes = timeout(wait, receiver.recv()).await.ok()??;
    Some(ChatPayload::decode(&bytes).unwrap().text)
}

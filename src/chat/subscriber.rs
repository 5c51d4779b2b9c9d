use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

/// Identity of a subscriber within its room's registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One live interest in a room's payload stream
///
/// The cancellation token belongs to the caller (typically a client
/// connection). The delivery sender is only ever used by the broadcaster
/// that owns the room; dropping the subscriber closes the caller's
/// receiver.
#[derive(Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct Subscriber {
    id: SubscriberId,
    room_id: String,
    cancel: CancellationToken,
    sender: mpsc::Sender<Vec<u8>>,
}

impl Subscriber {
    /// Creates a subscriber and the receiving end of its delivery channel
    pub fn new(
        room_id: impl Into<String>,
        cancel: CancellationToken,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let subscriber = Self {
            id: SubscriberId::new(),
            room_id: room_id.into(),
            cancel,
            sender,
        };
        (subscriber, receiver)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Whether the caller has ended this subscription
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the caller ends this subscription
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Whether the caller dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a payload, waiting for room in the delivery channel
    ///
    /// Fails only when the receiver has been dropped.
    pub async fn deliver(&self, payload: Vec<u8>) -> Result<(), mpsc::error::SendError<Vec<u8>>> {
        self.sender.send(payload).await
    }
}

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::ChatError;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::ChatConfig;
use crate::queue::{Queue, QueueError};

/// Outcome of a single pop-and-fan-out attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Delivered { recipients: usize, pruned: usize },
    Empty,
    Failed,
}

/// Subscriber changes, applied by the broadcaster in the order they were sent
#[derive(Debug)]
enum Control {
    Register(Subscriber),
    Remove(SubscriberId),
}

/// Cloneable handle used to reach a running broadcaster
#[derive(Debug, Clone)]
pub struct BroadcasterHandle {
    room_id: String,
    controls: mpsc::Sender<Control>,
}

impl BroadcasterHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Queues a subscriber for registration
    ///
    /// If the broadcaster has stopped, the subscriber is dropped, which
    /// closes its delivery channel.
    pub async fn register(&self, subscriber: Subscriber) -> Result<(), ChatError> {
        self.controls
            .send(Control::Register(subscriber))
            .await
            .map_err(|_| ChatError::Closed)
    }

    /// Queues an explicit removal, applied after any earlier registration
    pub async fn remove(&self, subscriber_id: SubscriberId) -> Result<(), ChatError> {
        self.controls
            .send(Control::Remove(subscriber_id))
            .await
            .map_err(|_| ChatError::Closed)
    }

    /// Whether the broadcaster task has stopped accepting work
    pub fn is_closed(&self) -> bool {
        self.controls.is_closed()
    }
}

/// Per-room actor that pops queued payloads and fans them out
///
/// The subscriber registry is owned by the broadcaster task; registrations
/// and removals arrive on one ordered control channel. Each loop iteration
/// checks, in order: shutdown, one pending control message, then a
/// delivery attempt.
pub struct Broadcaster {
    room_id: String,
    queue: Arc<dyn Queue>,
    subscribers: HashMap<SubscriberId, Subscriber>,
    controls: mpsc::Receiver<Control>,
    shutdown: CancellationToken,
    poll_interval: Duration,
}

impl Broadcaster {
    /// Creates a broadcaster for `room_id` and the handle used to reach it
    ///
    /// Nothing runs until `spawn` or `run` is called, so subscribers
    /// registered through the handle beforehand are seen before the first pop.
    ///
    /// # Panics
    ///
    /// Panics if `config.registration_buffer` is zero; see
    /// [`ChatConfig::validate`].
    pub fn new(
        room_id: impl Into<String>,
        queue: Arc<dyn Queue>,
        shutdown: CancellationToken,
        config: &ChatConfig,
    ) -> (Self, BroadcasterHandle) {
        let room_id = room_id.into();
        let (controls_tx, controls_rx) = mpsc::channel(config.registration_buffer);

        let broadcaster = Self {
            room_id: room_id.clone(),
            queue,
            subscribers: HashMap::new(),
            controls: controls_rx,
            shutdown,
            poll_interval: config.poll_interval,
        };

        let handle = BroadcasterHandle {
            room_id,
            controls: controls_tx,
        };

        (broadcaster, handle)
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Spawns the control loop on the runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs the control loop until the shutdown token is cancelled
    pub async fn run(mut self) {
        info!(room_id = %self.room_id, "Broadcaster started");

        loop {
            if self.shutdown.is_cancelled() {
                self.close();
                break;
            }

            if let Ok(control) = self.controls.try_recv() {
                match control {
                    Control::Register(subscriber) => self.register(subscriber),
                    Control::Remove(subscriber_id) => self.remove(subscriber_id),
                }
                continue;
            }

            match self.deliver_next().await {
                Sweep::Empty => self.idle().await,
                Sweep::Delivered { .. } | Sweep::Failed => tokio::task::yield_now().await,
            }
        }

        info!(room_id = %self.room_id, "Broadcaster stopped");
    }

    fn register(&mut self, subscriber: Subscriber) {
        if subscriber.room_id() != self.room_id {
            warn!(
                room_id = %self.room_id,
                subscriber_room = %subscriber.room_id(),
                subscriber_id = %subscriber.id(),
                "Subscriber routed to the wrong room, ignoring"
            );
            return;
        }

        match self.subscribers.entry(subscriber.id()) {
            Entry::Occupied(_) => {
                warn!(
                    room_id = %self.room_id,
                    subscriber_id = %subscriber.id(),
                    "Subscriber already registered, ignoring"
                );
            }
            Entry::Vacant(slot) => {
                debug!(
                    room_id = %self.room_id,
                    subscriber_id = %subscriber.id(),
                    "Subscriber registered"
                );
                slot.insert(subscriber);
            }
        }
    }

    fn remove(&mut self, subscriber_id: SubscriberId) {
        if self.subscribers.remove(&subscriber_id).is_some() {
            debug!(
                room_id = %self.room_id,
                subscriber_id = %subscriber_id,
                "Subscriber removed"
            );
        } else {
            debug!(
                room_id = %self.room_id,
                subscriber_id = %subscriber_id,
                "Removal requested for unknown subscriber"
            );
        }
    }

    /// Pops one payload for the room and sends it to every live subscriber
    ///
    /// Sends are sequential: a subscriber with a full channel holds up the
    /// rest of the sweep until it makes room, cancels, or the broadcaster
    /// shuts down.
    async fn deliver_next(&mut self) -> Sweep {
        let payload = match self.queue.pop(&self.room_id).await {
            Ok(payload) => payload,
            Err(QueueError::Empty) => return Sweep::Empty,
            Err(e) => {
                warn!(room_id = %self.room_id, error = %e, "Failed to pop payload from queue");
                return Sweep::Failed;
            }
        };

        let mut pruned = Vec::new();
        let mut recipients = 0;

        for (subscriber_id, subscriber) in &self.subscribers {
            if subscriber.is_cancelled() {
                pruned.push(*subscriber_id);
                continue;
            }

            let delivered = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = subscriber.cancelled() => false,
                sent = subscriber.deliver(payload.clone()) => sent.is_ok(),
            };

            if delivered {
                recipients += 1;
            } else {
                pruned.push(*subscriber_id);
            }
        }

        for subscriber_id in &pruned {
            if self.subscribers.remove(subscriber_id).is_some() {
                debug!(
                    room_id = %self.room_id,
                    subscriber_id = %subscriber_id,
                    "Subscriber left, delivery channel closed"
                );
            }
        }

        debug!(
            room_id = %self.room_id,
            recipients = recipients,
            pruned = pruned.len(),
            bytes = payload.len(),
            "Payload fanned out"
        );

        Sweep::Delivered {
            recipients,
            pruned: pruned.len(),
        }
    }

    async fn idle(&self) {
        tokio::select! {
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(self.poll_interval) => {}
        }
    }

    /// Closes every registered and pending subscriber channel
    fn close(&mut self) {
        let registered = self.subscribers.len();
        self.subscribers.clear();

        self.controls.close();

        let mut pending = 0;
        while let Ok(control) = self.controls.try_recv() {
            if let Control::Register(subscriber) = control {
                drop(subscriber);
                pending += 1;
            }
        }

        info!(
            room_id = %self.room_id,
            registered = registered,
            pending = pending,
            "Broadcaster shutting down, subscriber channels closed"
        );
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

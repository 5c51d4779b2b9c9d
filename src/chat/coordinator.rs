use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::broadcaster::{Broadcaster, BroadcasterHandle};
use super::error::ChatError;
use super::listener::Listener;
use super::subscriber::{Subscriber, SubscriberId};
use crate::config::{ChatConfig, ConfigError};
use crate::event::EventSource;
use crate::queue::Queue;

/// Requests handled by the coordinator's control loop
enum Command {
    Subscribe(Subscriber),
    Unsubscribe {
        room_id: String,
        subscriber_id: SubscriberId,
    },
    ActiveRooms(oneshot::Sender<Vec<String>>),
}

/// Single entry point for live room subscriptions
///
/// Construct one per process with `start` and share it (e.g. behind an
/// `Arc` in application state). It owns the listener and lazily creates one
/// broadcaster per room on first subscription. The room map is only touched
/// by the coordinator's own control loop; callers talk to it through an
/// unbounded request channel.
pub struct ChatCoordinator {
    shutdown: CancellationToken,
    commands: mpsc::UnboundedSender<Command>,
    delivery_buffer: usize,
    listener: JoinHandle<()>,
}

impl ChatCoordinator {
    /// Starts the listener and the control loop
    ///
    /// Cancelling `shutdown` (or calling `shutdown`) stops the coordinator,
    /// every broadcaster and the listener. Fails without spawning anything
    /// if `config` does not validate.
    pub fn start(
        queue: Arc<dyn Queue>,
        source: Arc<dyn EventSource>,
        config: ChatConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let listener = Listener::new(source, Arc::clone(&queue), config.listener_buffer)
            .spawn(shutdown.clone());

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let control = ControlLoop {
            queue,
            config: config.clone(),
            rooms: HashMap::new(),
            commands: commands_rx,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(control.run());

        Ok(Self {
            shutdown,
            commands: commands_tx,
            delivery_buffer: config.delivery_buffer,
            listener,
        })
    }

    /// Subscribes to a room's payload stream
    ///
    /// The returned channel yields payloads in queue order until `cancel`
    /// is cancelled (noticed on the room's next delivery) or the
    /// coordinator shuts down; it is then closed.
    pub fn subscribe(
        &self,
        cancel: CancellationToken,
        room_id: &str,
    ) -> Result<mpsc::Receiver<Vec<u8>>, ChatError> {
        self.subscribe_with_id(cancel, room_id)
            .map(|(_, receiver)| receiver)
    }

    /// Like `subscribe`, also returning the id accepted by `unsubscribe`
    #[instrument(skip(self, cancel))]
    pub fn subscribe_with_id(
        &self,
        cancel: CancellationToken,
        room_id: &str,
    ) -> Result<(SubscriberId, mpsc::Receiver<Vec<u8>>), ChatError> {
        if self.shutdown.is_cancelled() {
            return Err(ChatError::Closed);
        }

        let (subscriber, receiver) = Subscriber::new(room_id, cancel, self.delivery_buffer);
        let subscriber_id = subscriber.id();

        self.commands
            .send(Command::Subscribe(subscriber))
            .map_err(|_| ChatError::Closed)?;

        debug!(room_id = %room_id, subscriber_id = %subscriber_id, "Subscription requested");
        Ok((subscriber_id, receiver))
    }

    /// Removes a subscriber without waiting for the room's next delivery
    pub fn unsubscribe(&self, room_id: &str, subscriber_id: SubscriberId) -> Result<(), ChatError> {
        if self.shutdown.is_cancelled() {
            return Err(ChatError::Closed);
        }

        self.commands
            .send(Command::Unsubscribe {
                room_id: room_id.to_string(),
                subscriber_id,
            })
            .map_err(|_| ChatError::Closed)
    }

    /// Rooms that currently own a broadcaster, sorted by id
    pub async fn active_rooms(&self) -> Result<Vec<String>, ChatError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::ActiveRooms(reply_tx))
            .map_err(|_| ChatError::Closed)?;
        reply_rx.await.map_err(|_| ChatError::Closed)
    }

    /// Stops the coordinator, all broadcasters and the listener
    pub fn shutdown(&self) {
        info!("Chat coordinator shutdown requested");
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Whether the listener has stopped consuming the event source
    pub fn listener_finished(&self) -> bool {
        self.listener.is_finished()
    }
}

struct ControlLoop {
    queue: Arc<dyn Queue>,
    config: ChatConfig,
    rooms: HashMap<String, BroadcasterHandle>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
}

impl ControlLoop {
    async fn run(mut self) {
        info!("Chat coordinator started");

        loop {
            let command = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            match command {
                Command::Subscribe(subscriber) => self.route(subscriber).await,
                Command::Unsubscribe {
                    room_id,
                    subscriber_id,
                } => self.unsubscribe(&room_id, subscriber_id).await,
                Command::ActiveRooms(reply) => {
                    let mut rooms: Vec<String> = self.rooms.keys().cloned().collect();
                    rooms.sort();
                    let _ = reply.send(rooms);
                }
            }
        }

        // Dropping queued subscribers closes their delivery channels
        self.commands.close();
        let mut dropped = 0;
        while let Ok(command) = self.commands.try_recv() {
            if matches!(command, Command::Subscribe(_)) {
                dropped += 1;
            }
        }

        info!(
            rooms = self.rooms.len(),
            dropped_subscriptions = dropped,
            "Chat coordinator stopped"
        );
    }

    /// Forwards a subscriber to its room's broadcaster, creating it if needed
    async fn route(&mut self, subscriber: Subscriber) {
        let room_id = subscriber.room_id().to_string();
        let subscriber_id = subscriber.id();

        if let Some(handle) = self.rooms.get(&room_id) {
            let registered = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => false,
                result = handle.register(subscriber) => result.is_ok(),
            };

            if registered {
                debug!(room_id = %room_id, subscriber_id = %subscriber_id, "Subscriber forwarded");
            } else {
                debug!(
                    room_id = %room_id,
                    subscriber_id = %subscriber_id,
                    "Broadcaster stopped, subscriber dropped"
                );
            }
            return;
        }

        let (broadcaster, handle) = Broadcaster::new(
            room_id.clone(),
            Arc::clone(&self.queue),
            self.shutdown.child_token(),
            &self.config,
        );

        // Queued before the task starts so it is registered ahead of the first pop
        if handle.register(subscriber).await.is_err() {
            warn!(room_id = %room_id, subscriber_id = %subscriber_id, "New broadcaster rejected subscriber");
        }

        broadcaster.spawn();
        info!(room_id = %room_id, rooms = self.rooms.len() + 1, "Broadcaster created for room");
        self.rooms.insert(room_id, handle);
    }

    async fn unsubscribe(&self, room_id: &str, subscriber_id: SubscriberId) {
        let Some(handle) = self.rooms.get(room_id) else {
            debug!(room_id = %room_id, subscriber_id = %subscriber_id, "Unsubscribe for unknown room");
            return;
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {}
            _ = handle.remove(subscriber_id) => {}
        }
    }
}

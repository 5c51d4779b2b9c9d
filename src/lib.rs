// Library crate for the roomcast fan-out engine
// This file exposes the public API for the binary and integration tests

pub mod chat;
pub mod config;
pub mod event;
pub mod queue;
pub mod routes;

// Re-export commonly used types for easier access in tests
pub use chat::{
    Broadcaster, BroadcasterHandle, ChatCoordinator, ChatError, ChatPayload, Listener,
    Subscriber, SubscriberId,
};
pub use config::{ChatConfig, ConfigError};
pub use event::{BusEventSource, EventSource, EventSourceError, MessageEvent, MessageSender};
pub use queue::{InMemoryQueue, Queue, QueueError};

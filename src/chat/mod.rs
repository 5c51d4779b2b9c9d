// Real-time fan-out of chat messages
//
// Flow: event source -> Listener -> Queue (per room) -> Broadcaster (per
// room) -> Subscriber delivery channels. The ChatCoordinator is the single
// entry point and owns the listener and the room -> broadcaster map.

// Public API - what other modules can use
pub use broadcaster::{Broadcaster, BroadcasterHandle};
pub use coordinator::ChatCoordinator;
pub use error::ChatError;
pub use listener::Listener;
pub use payload::{ChatPayload, PayloadError};
pub use subscriber::{Subscriber, SubscriberId};

// Internal modules
mod broadcaster;
mod coordinator;
mod error;
mod listener;
mod payload;
mod subscriber;

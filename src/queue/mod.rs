// Per-key FIFO queue used as the handoff buffer between the listener and
// the per-room broadcasters.

pub use memory::InMemoryQueue;
pub use store::{Queue, QueueError};

mod memory;
mod store;

// Event bus side of the fan-out engine
//
// Message events arrive from an external bus through the `EventSource`
// contract. `BusEventSource` is the in-process implementation used by the
// binary and tests.

// Public API - what other modules can use
pub use bus::BusEventSource;
pub use events::{MessageEvent, MessageSender};
pub use source::{EventSource, EventSourceError};

// Internal modules
mod bus;
mod events;
mod source;

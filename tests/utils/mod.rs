pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{message, RecordingQueue};
#[allow(unused_imports)]
pub use setup::{next_text, settle, try_next_text, TestSetup, TestSetupBuilder};

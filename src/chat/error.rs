use thiserror::Error;

/// Errors returned to callers of the chat coordinator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    /// The coordinator has shut down and accepts no new work
    #[error("chat closed")]
    Closed,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The author of a chat message as resolved by the event producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSender {
    pub id: String,
    pub display_name: String,
}

/// A chat message published on the event bus
///
/// Events are facts about messages that have already been accepted. The
/// sender is optional because producers may publish before the author's
/// profile is resolved; such events cannot be displayed and are dropped by
/// the listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: Uuid,
    pub room_id: String,
    pub sender: Option<MessageSender>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl MessageEvent {
    /// Creates a new event stamped with a fresh id and the current time
    pub fn new(room_id: impl Into<String>, sender: MessageSender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            sender: Some(sender),
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// Get the room_id this message was posted to
    pub fn room_id(&self) -> &str {
        &self.room_id
    }
}

impl MessageSender {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

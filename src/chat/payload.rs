use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::MessageEvent;

/// Errors that can occur while building a display payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Message {0} has no sender")]
    MissingSender(String),

    #[error("Message {0} has a blank sender display name")]
    BlankSenderName(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Displayable form of a chat message, the unit delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatPayload {
    /// Builds the display payload for a message event
    pub fn from_event(event: &MessageEvent) -> Result<Self, PayloadError> {
        let sender = event
            .sender
            .as_ref()
            .ok_or_else(|| PayloadError::MissingSender(event.id.to_string()))?;

        if sender.display_name.trim().is_empty() {
            return Err(PayloadError::BlankSenderName(event.id.to_string()));
        }

        Ok(Self {
            sender_name: sender.display_name.clone(),
            text: event.text.clone(),
            created_at: event.created_at,
        })
    }

    /// Builds and serializes the payload in one step
    pub fn encode(event: &MessageEvent) -> Result<Vec<u8>, PayloadError> {
        let payload = Self::from_event(event)?;
        Ok(serde_json::to_vec(&payload)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MessageSender;
    use rstest::rstest;

    #[test]
    fn test_encode_carries_display_fields() {
        let event = MessageEvent::new("r1", MessageSender::new("u1", "Alice"), "hi there");

        let bytes = ChatPayload::encode(&event).unwrap();
        let payload = ChatPayload::decode(&bytes).unwrap();

        assert_eq!(payload.sender_name, "Alice");
        assert_eq!(payload.text, "hi there");
        assert_eq!(payload.created_at, event.created_at);
    }

    #[test]
    fn test_room_and_sender_id_are_not_exposed() {
        let event = MessageEvent::new("secret-room", MessageSender::new("u-42", "Bob"), "x");

        let bytes = ChatPayload::encode(&event).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(object.contains_key("sender_name"));
        assert!(!bytes.windows(11).any(|w| w == b"secret-room"));
    }

    #[test]
    fn test_missing_sender_is_rejected() {
        let mut event = MessageEvent::new("r1", MessageSender::new("u1", "Alice"), "hi");
        event.sender = None;

        let result = ChatPayload::encode(&event);

        assert!(matches!(result, Err(PayloadError::MissingSender(_))));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn test_blank_sender_name_is_rejected(#[case] name: &str) {
        let event = MessageEvent::new("r1", MessageSender::new("u1", name), "hi");

        let result = ChatPayload::from_event(&event);

        assert!(matches!(result, Err(PayloadError::BlankSenderName(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = ChatPayload::decode(b"not json");
        assert!(matches!(result, Err(PayloadError::Serialization(_))));
    }
}

//! Typed messages exchanged with the frontend.
//!
//! [`Command`]s come in, [`Message`]s go out through a [`MessageBus`]. The bus is created
//! by the caller and handed to the execution layer, there is no global instance.

pub mod incoming;
pub mod outgoing;

use thiserror::Error;
use tokio::sync::broadcast;

pub use incoming::{BulkAction, Command, ExecutionAction, FileAction};
pub use outgoing::{Message, Notification, NotificationEvent};

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Failed to decode command: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode a JSON command as sent by the frontend.
pub fn decode_command(json: &str) -> Result<Command, MessageError> {
    serde_json::from_str(json).map_err(MessageError::Decode)
}

/// Encode an outgoing message to JSON.
pub fn encode_message(message: &Message) -> Result<String, MessageError> {
    serde_json::to_string(message).map_err(MessageError::Encode)
}

/// Fan-out channel for outgoing messages.
#[derive(Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<Message>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Messages without subscribers are dropped.
    pub fn publish(&self, message: Message) {
        tracing::trace!("Publishing {}", message.key());
        let _ = self.tx.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = MessageBus::default();
        let mut rx = bus.subscribe();

        bus.publish(Message::ProjectStatus { has_changed: true });

        assert_eq!(rx.try_recv().unwrap(), Message::ProjectStatus { has_changed: true });
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = MessageBus::default();
        bus.publish(Message::LoopFault { message: "x".into() });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_decode_error() {
        assert!(matches!(decode_command("{\"key\":\"Nope\"}"), Err(MessageError::Decode(_))));
    }

    #[test]
    fn test_encode() {
        let json = encode_message(&Message::ProjectStatus { has_changed: false }).unwrap();
        assert_eq!(json, r#"{"key":"ProjectStatus","payload":{"HasChanged":false}}"#);
    }
}

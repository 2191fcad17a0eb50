//! Messaging service that records messages instead of sending them

use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::domain::messaging::{MessageId, MessagingService, OutboundMessage};
use crate::domain::DomainError;

/// Keeps every accepted message in memory; used when no provider endpoint is configured
#[derive(Debug, Default)]
pub struct OutboxMessagingService {
    sent: RwLock<Vec<(MessageId, OutboundMessage)>>,
}

impl OutboxMessagingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far, oldest first
    pub fn sent(&self) -> Vec<(MessageId, OutboundMessage)> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessagingService for OutboxMessagingService {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, DomainError> {
        let id = MessageId::new(format!("msg-{}", uuid::Uuid::new_v4()));

        info!(message_id = %id, to = %message.to, "Message recorded in outbox");

        self.sent
            .write()
            .map_err(|e| DomainError::internal(format!("Outbox lock poisoned: {}", e)))?
            .push((id.clone(), message));

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_records_message() {
        let outbox = OutboxMessagingService::new();

        let id = outbox
            .send(OutboundMessage::new("a@example.com", "Hi", "Body"))
            .await
            .unwrap();

        let sent = outbox.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, id);
        assert_eq!(sent[0].1.subject, "Hi");
    }
}

//! Outbound messaging collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Identifier returned by the messaging provider for an accepted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbound email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub content: String,
}

impl OutboundMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            content: content.into(),
        }
    }
}

/// Sends email on behalf of workflow actions
///
/// Provider errors are surfaced verbatim in the action result, so
/// implementations should put a readable reason in the error message.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessagingService: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, DomainError>;
}

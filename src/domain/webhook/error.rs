//! Webhook error types

use thiserror::Error;

use crate::domain::DomainError;

/// Configuration-level delivery errors, returned before any attempt is made
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WebhookError {
    #[error("Webhook not found: {0}")]
    NotFound(String),

    #[error("Webhook is inactive: {0}")]
    Inactive(String),

    #[error("Webhook '{webhook_id}' is not subscribed to event '{event_type}'")]
    NotSubscribed {
        webhook_id: String,
        event_type: String,
    },

    #[error("Failed to serialize payload: {0}")]
    Serialization(String),

    #[error("Failed to sign payload: {0}")]
    Signing(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn inactive(id: impl Into<String>) -> Self {
        Self::Inactive(id.into())
    }

    pub fn not_subscribed(webhook_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self::NotSubscribed {
            webhook_id: webhook_id.into(),
            event_type: event_type.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing(message.into())
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<WebhookError> for DomainError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::NotFound(_) => DomainError::not_found(err.to_string()),
            WebhookError::Inactive(_) | WebhookError::NotSubscribed { .. } => {
                DomainError::validation(err.to_string())
            }
            WebhookError::Storage(message) => DomainError::storage(message),
            other => DomainError::internal(other.to_string()),
        }
    }
}

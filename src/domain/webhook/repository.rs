//! Webhook persistence and delivery traits

use async_trait::async_trait;
use serde_json::Value;

use super::{DeliveryOutcome, Webhook, WebhookDeliveryAttempt, WebhookError, WebhookId};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for webhook persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn create(&self, webhook: Webhook) -> Result<Webhook, DomainError>;

    async fn update(&self, webhook: Webhook) -> Result<Webhook, DomainError>;

    async fn delete(&self, id: &WebhookId) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: &WebhookId) -> Result<Option<Webhook>, DomainError>;

    async fn list(&self) -> Result<Vec<Webhook>, DomainError>;

    /// Active webhooks subscribed to the event type
    async fn find_active_by_event(&self, event_type: &str) -> Result<Vec<Webhook>, DomainError>;

    /// Stamps `last_success_at` or `last_failure_at` on the stored webhook, leaving
    /// every other field as currently stored. Returns false if the webhook is gone.
    async fn record_delivery_result(
        &self,
        id: &WebhookId,
        success: bool,
    ) -> Result<bool, DomainError>;
}

/// Append-only delivery attempt log
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookDeliveryLogRepository: Send + Sync {
    async fn append(
        &self,
        attempt: WebhookDeliveryAttempt,
    ) -> Result<WebhookDeliveryAttempt, DomainError>;

    /// Attempts for a webhook, newest first
    async fn find_by_webhook(
        &self,
        webhook_id: &WebhookId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<WebhookDeliveryAttempt>, DomainError>;
}

/// Delivers one event to one webhook with signing, retries and attempt logging
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WebhookDeliverer: Send + Sync {
    async fn deliver(
        &self,
        webhook_id: &WebhookId,
        event_type: &str,
        payload: Value,
    ) -> Result<DeliveryOutcome, WebhookError>;
}

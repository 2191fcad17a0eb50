//! Storage-backed webhook repositories

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::storage::Storage;
use crate::domain::webhook::{
    Webhook, WebhookDeliveryAttempt, WebhookDeliveryLogRepository, WebhookId, WebhookRepository,
};
use crate::domain::DomainError;

/// Storage-backed implementation of WebhookRepository
#[derive(Debug)]
pub struct StorageWebhookRepository {
    storage: Arc<dyn Storage<Webhook>>,
}

impl StorageWebhookRepository {
    pub fn new(storage: Arc<dyn Storage<Webhook>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl WebhookRepository for StorageWebhookRepository {
    async fn create(&self, webhook: Webhook) -> Result<Webhook, DomainError> {
        if self.storage.exists(&webhook.id).await? {
            return Err(DomainError::conflict(format!(
                "Webhook '{}' already exists",
                webhook.id
            )));
        }

        self.storage.create(webhook).await
    }

    async fn update(&self, webhook: Webhook) -> Result<Webhook, DomainError> {
        if !self.storage.exists(&webhook.id).await? {
            return Err(DomainError::not_found(format!(
                "Webhook '{}' not found",
                webhook.id
            )));
        }

        self.storage.update(webhook).await
    }

    async fn delete(&self, id: &WebhookId) -> Result<bool, DomainError> {
        self.storage.delete(id).await
    }

    async fn find_by_id(&self, id: &WebhookId) -> Result<Option<Webhook>, DomainError> {
        self.storage.get(id).await
    }

    async fn list(&self) -> Result<Vec<Webhook>, DomainError> {
        let mut webhooks = self.storage.list().await?;
        webhooks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(webhooks)
    }

    async fn find_active_by_event(&self, event_type: &str) -> Result<Vec<Webhook>, DomainError> {
        let mut webhooks: Vec<_> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|w| w.is_active && w.is_subscribed_to(event_type))
            .collect();

        webhooks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(webhooks)
    }

    async fn record_delivery_result(
        &self,
        id: &WebhookId,
        success: bool,
    ) -> Result<bool, DomainError> {
        let Some(mut current) = self.storage.get(id).await? else {
            return Ok(false);
        };

        if success {
            current.record_success();
        } else {
            current.record_failure();
        }

        self.storage.update(current).await?;
        Ok(true)
    }
}

/// Storage-backed implementation of WebhookDeliveryLogRepository
#[derive(Debug)]
pub struct StorageWebhookDeliveryLogRepository {
    storage: Arc<dyn Storage<WebhookDeliveryAttempt>>,
}

impl StorageWebhookDeliveryLogRepository {
    pub fn new(storage: Arc<dyn Storage<WebhookDeliveryAttempt>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl WebhookDeliveryLogRepository for StorageWebhookDeliveryLogRepository {
    async fn append(
        &self,
        attempt: WebhookDeliveryAttempt,
    ) -> Result<WebhookDeliveryAttempt, DomainError> {
        self.storage.create(attempt).await
    }

    async fn find_by_webhook(
        &self,
        webhook_id: &WebhookId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<WebhookDeliveryAttempt>, DomainError> {
        let mut attempts: Vec<_> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|a| &a.webhook_id == webhook_id)
            .collect();

        // Newest first; attempts of one send can share a timestamp
        attempts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.attempt.cmp(&a.attempt))
        });

        Ok(attempts.into_iter().skip(offset).take(limit).collect())
    }
}

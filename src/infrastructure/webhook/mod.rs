//! Webhook infrastructure implementations

mod service;
mod storage_repository;

pub use service::{DeliverySettings, EventDelivery, WebhookService, WebhookServiceTrait};
pub use storage_repository::{StorageWebhookDeliveryLogRepository, StorageWebhookRepository};

//! Application state shared by the HTTP handlers

use std::sync::Arc;

use crate::domain::lead::LeadRepository;
use crate::domain::task::TaskRepository;
use crate::infrastructure::services::WorkflowServiceTrait;
use crate::infrastructure::webhook::WebhookServiceTrait;

/// Shared services, held behind trait objects
#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<dyn WorkflowServiceTrait>,
    pub webhook_service: Arc<dyn WebhookServiceTrait>,
    pub lead_repository: Arc<dyn LeadRepository>,
    pub task_repository: Arc<dyn TaskRepository>,
}

impl AppState {
    pub fn new(
        workflow_service: Arc<dyn WorkflowServiceTrait>,
        webhook_service: Arc<dyn WebhookServiceTrait>,
        lead_repository: Arc<dyn LeadRepository>,
        task_repository: Arc<dyn TaskRepository>,
    ) -> Self {
        Self {
            workflow_service,
            webhook_service,
            lead_repository,
            task_repository,
        }
    }
}

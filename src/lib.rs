//! LeadFlow
//!
//! Workflow automation core for a lead CRM:
//! - Rules with AND-combined conditions and ordered typed actions
//! - Execution tracking with a terminal-once lifecycle
//! - Signed outbound webhooks with retries and per-attempt logs
//! - In-memory or PostgreSQL storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::lead::Lead;
use domain::messaging::MessagingService;
use domain::task::FollowUpTask;
use domain::webhook::{Webhook, WebhookDeliveryAttempt};
use domain::workflow::{WorkflowExecution, WorkflowRule};
use infrastructure::{
    lead::StorageLeadRepository,
    messaging::{HttpMessagingService, OutboxMessagingService},
    services::WorkflowService,
    storage::StorageFactory,
    task::StorageTaskRepository,
    webhook::{
        DeliverySettings, StorageWebhookDeliveryLogRepository, StorageWebhookRepository,
        WebhookService,
    },
    workflow::{
        ActionDispatcherImpl, ExecutionTracker, StorageWorkflowExecutionRepository,
        StorageWorkflowRuleRepository, WorkflowEngineConfig, WorkflowEngineImpl,
    },
};
use tracing::info;

/// Opens the configured storage backend and wires every service on top of it
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage = StorageFactory::connect(&config.storage).await?;
    info!(backend = ?storage.storage_type(), "Storage backend ready");

    build_app_state(config, &storage).await
}

/// Wires services over an already opened storage backend
pub async fn build_app_state(
    config: &AppConfig,
    storage: &StorageFactory,
) -> anyhow::Result<AppState> {
    let leads = Arc::new(StorageLeadRepository::new(
        storage.create::<Lead>("leads").await?,
    ));
    let tasks = Arc::new(StorageTaskRepository::new(
        storage.create::<FollowUpTask>("follow_up_tasks").await?,
    ));
    let rules = Arc::new(StorageWorkflowRuleRepository::new(
        storage.create::<WorkflowRule>("workflow_rules").await?,
    ));
    let executions = Arc::new(StorageWorkflowExecutionRepository::new(
        storage
            .create::<WorkflowExecution>("workflow_executions")
            .await?,
    ));
    let webhooks = Arc::new(StorageWebhookRepository::new(
        storage.create::<Webhook>("webhooks").await?,
    ));
    let delivery_log = Arc::new(StorageWebhookDeliveryLogRepository::new(
        storage
            .create::<WebhookDeliveryAttempt>("webhook_deliveries")
            .await?,
    ));

    let http_client = reqwest::Client::builder().build()?;

    let messaging: Arc<dyn MessagingService> =
        match HttpMessagingService::from_settings(http_client.clone(), &config.messaging) {
            Some(service) => {
                info!("Sending messages through the configured HTTP provider");
                Arc::new(service)
            }
            None => {
                info!("No messaging endpoint configured, messages go to the in-process outbox");
                Arc::new(OutboxMessagingService::new())
            }
        };

    let webhook_service = Arc::new(
        WebhookService::new(webhooks, delivery_log, http_client)
            .with_settings(DeliverySettings::from(&config.webhook)),
    );

    let dispatcher = Arc::new(ActionDispatcherImpl::new(
        leads.clone(),
        tasks.clone(),
        messaging,
        webhook_service.clone(),
    ));

    let engine = Arc::new(
        WorkflowEngineImpl::new(
            rules.clone(),
            leads.clone(),
            dispatcher,
            ExecutionTracker::new(executions.clone()),
        )
        .with_config(WorkflowEngineConfig {
            invocation_timeout: Duration::from_secs(config.workflow.invocation_timeout_secs),
        }),
    );

    let workflow_service = Arc::new(WorkflowService::new(
        rules,
        executions,
        leads.clone(),
        engine,
        webhook_service.clone(),
    ));

    Ok(AppState::new(workflow_service, webhook_service, leads, tasks))
}

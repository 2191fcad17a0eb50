//! Action dispatcher backed by the lead, task, messaging and webhook collaborators

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::lead::{Lead, LeadRepository};
use crate::domain::messaging::{MessagingService, OutboundMessage};
use crate::domain::task::{FollowUpTask, TaskKind, TaskPriority, TaskRepository};
use crate::domain::webhook::{WebhookDeliverer, WebhookId};
use crate::domain::workflow::{
    Action, ActionDispatcher, ActionResult, ExecutionContext, FollowUpParams, SendEmailParams,
    SendWebhookParams, WorkflowError,
};
use crate::domain::DomainError;

const DEFAULT_EMAIL_SUBJECT: &str = "Follow-up";
const DEFAULT_TASK_TITLE: &str = "Follow-up task";
const DEFAULT_REMINDER_TITLE: &str = "Reminder";
const DEFAULT_REMINDER_TYPE: &str = "call";
const DEFAULT_WEBHOOK_EVENT: &str = "workflow.action";
const DEFAULT_DUE_HOURS: i64 = 24;

/// Dispatches actions against the configured collaborators
pub struct ActionDispatcherImpl {
    leads: Arc<dyn LeadRepository>,
    tasks: Arc<dyn TaskRepository>,
    messaging: Arc<dyn MessagingService>,
    webhooks: Arc<dyn WebhookDeliverer>,
}

impl std::fmt::Debug for ActionDispatcherImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcherImpl")
            .field("messaging", &self.messaging)
            .finish_non_exhaustive()
    }
}

/// Collapses a deadline-bounded collaborator call into a single error string
fn settle<T, E: Display>(result: Result<Result<T, E>, WorkflowError>) -> Result<T, String> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Collaborator errors carry the provider's own message
fn collaborator_message(err: DomainError) -> String {
    match err {
        DomainError::Collaborator { message, .. } => message,
        other => other.to_string(),
    }
}

impl ActionDispatcherImpl {
    pub fn new(
        leads: Arc<dyn LeadRepository>,
        tasks: Arc<dyn TaskRepository>,
        messaging: Arc<dyn MessagingService>,
        webhooks: Arc<dyn WebhookDeliverer>,
    ) -> Self {
        Self {
            leads,
            tasks,
            messaging,
            webhooks,
        }
    }

    async fn assign_agent(
        &self,
        agent_id: &str,
        lead: &Lead,
        ctx: &ExecutionContext,
    ) -> Result<Value, String> {
        settle(
            ctx.bounded("assign_agent", self.leads.assign_agent(&lead.id, agent_id))
                .await,
        )?;
        Ok(json!({ "agent_id": agent_id }))
    }

    async fn update_status(
        &self,
        status: &str,
        lead: &Lead,
        ctx: &ExecutionContext,
    ) -> Result<Value, String> {
        settle(
            ctx.bounded("update_status", self.leads.update_status(&lead.id, status))
                .await,
        )?;
        Ok(json!({ "status": status }))
    }

    async fn send_email(
        &self,
        params: &SendEmailParams,
        lead: &Lead,
        ctx: &ExecutionContext,
    ) -> Result<Value, String> {
        let to = lead
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| "Lead has no email address".to_string())?;

        let message = OutboundMessage::new(
            to,
            params.subject.as_deref().unwrap_or(DEFAULT_EMAIL_SUBJECT),
            params.content.as_deref().unwrap_or_default(),
        );

        let message_id = ctx
            .bounded("send_email", self.messaging.send(message))
            .await
            .map_err(|e| e.to_string())?
            .map_err(collaborator_message)?;

        Ok(json!({ "message_id": message_id }))
    }

    async fn create_follow_up(
        &self,
        params: &FollowUpParams,
        kind: TaskKind,
        default_title: &str,
        lead: &Lead,
        ctx: &ExecutionContext,
    ) -> Result<FollowUpTask, String> {
        let assigned_to = params
            .assigned_to
            .clone()
            .unwrap_or_else(|| ctx.acting_user_id().to_string());
        let due_date = params
            .due_date
            .unwrap_or_else(|| Utc::now() + Duration::hours(DEFAULT_DUE_HOURS));
        let priority = params
            .priority
            .as_deref()
            .and_then(TaskPriority::parse)
            .unwrap_or_default();

        let mut task = FollowUpTask::new(
            lead.id.clone(),
            kind,
            params.title.as_deref().unwrap_or(default_title),
            assigned_to,
            ctx.acting_user_id(),
            due_date,
        )
        .with_priority(priority);

        if let Some(description) = &params.description {
            task = task.with_description(description.clone());
        }

        settle(ctx.bounded("create_task", self.tasks.create(task)).await)
    }

    async fn send_webhook(
        &self,
        params: &SendWebhookParams,
        lead: &Lead,
        ctx: &ExecutionContext,
    ) -> Result<Value, String> {
        let event_type = params
            .event_type
            .as_deref()
            .unwrap_or(DEFAULT_WEBHOOK_EVENT);
        let payload = params.payload.clone().unwrap_or_else(|| {
            json!({
                "rule_id": ctx.rule_id(),
                "execution_id": ctx.execution_id(),
                "lead": lead.to_record(),
            })
        });

        // Bounded per attempt by the webhook's own timeout, not by the invocation deadline
        let webhook_id = WebhookId::new(params.webhook_id.clone());
        let outcome = self
            .webhooks
            .deliver(&webhook_id, event_type, payload)
            .await
            .map_err(|e| e.to_string())?;

        if outcome.success {
            Ok(json!({ "status": outcome.status, "attempts": outcome.attempts }))
        } else {
            Err(format!(
                "Webhook delivery failed after {} attempts: {}",
                outcome.attempts,
                outcome.error.unwrap_or_else(|| "unknown error".to_string())
            ))
        }
    }
}

#[async_trait]
impl ActionDispatcher for ActionDispatcherImpl {
    async fn execute(&self, action: &Action, lead: &Lead, ctx: &ExecutionContext) -> ActionResult {
        let action_type = action.type_name().to_string();

        let result = match action {
            Action::AssignAgent(p) => self.assign_agent(&p.agent_id, lead, ctx).await,
            Action::UpdateStatus(p) => self.update_status(&p.status, lead, ctx).await,
            Action::SendEmail(p) => self.send_email(p, lead, ctx).await,
            Action::CreateTask(p) => self
                .create_follow_up(p, TaskKind::Task, DEFAULT_TASK_TITLE, lead, ctx)
                .await
                .map(|task| json!({ "task_id": task.id })),
            Action::CreateReminder(p) => {
                let reminder_type = p
                    .reminder_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REMINDER_TYPE.to_string());
                let kind = TaskKind::Reminder {
                    reminder_type: reminder_type.clone(),
                };
                self.create_follow_up(p, kind, DEFAULT_REMINDER_TITLE, lead, ctx)
                    .await
                    .map(|task| json!({ "task_id": task.id, "reminder_type": reminder_type }))
            }
            Action::SendWebhook(p) => self.send_webhook(p, lead, ctx).await,
            Action::Unknown { .. } => Err("Unknown action type".to_string()),
        };

        match result {
            Ok(data) => {
                debug!(
                    execution_id = %ctx.execution_id(),
                    action_type = %action_type,
                    "Action succeeded"
                );
                ActionResult::success(action_type, data)
            }
            Err(error) => {
                warn!(
                    execution_id = %ctx.execution_id(),
                    action_type = %action_type,
                    error = %error,
                    "Action failed"
                );
                ActionResult::failure(action_type, error)
            }
        }
    }
}

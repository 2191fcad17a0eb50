//! Workflow service - rule management, execution history and lead event handling

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::domain::lead::{LeadId, LeadRepository};
use crate::domain::workflow::{
    Action, Condition, ExecuteRuleRequest, ExecuteRuleResponse, ExecutionId, RuleId,
    WorkflowEngine, WorkflowExecution, WorkflowExecutionRepository, WorkflowRule,
    WorkflowRuleRepository,
};
use crate::domain::DomainError;
use crate::infrastructure::webhook::{EventDelivery, WebhookServiceTrait};

/// Request to create a new rule
#[derive(Debug, Clone)]
pub struct CreateRuleRequest {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub trigger_event: Option<String>,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub is_active: bool,
}

impl CreateRuleRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            trigger_event: None,
            conditions: Vec::new(),
            actions: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_trigger_event(mut self, event: impl Into<String>) -> Self {
        self.trigger_event = Some(event.into());
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// Partial update; `Some(None)` clears an optional field
#[derive(Debug, Clone, Default)]
pub struct UpdateRuleRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub trigger_event: Option<Option<String>>,
    pub conditions: Option<Vec<Condition>>,
    pub actions: Option<Vec<Action>>,
    pub is_active: Option<bool>,
}

impl UpdateRuleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }
}

/// Outcome of one rule run triggered by a lead event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRun {
    pub rule_id: RuleId,
    #[serde(flatten)]
    pub response: ExecuteRuleResponse,
}

/// Everything a lead event set in motion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadEventSummary {
    pub event_type: String,
    pub lead_id: LeadId,
    pub rules: Vec<RuleRun>,
    pub webhooks: Vec<EventDelivery>,
}

/// Trait for workflow service operations
#[async_trait]
pub trait WorkflowServiceTrait: Send + Sync + std::fmt::Debug {
    async fn create_rule(&self, request: CreateRuleRequest) -> Result<WorkflowRule, DomainError>;

    async fn update_rule(
        &self,
        id: &str,
        request: UpdateRuleRequest,
    ) -> Result<WorkflowRule, DomainError>;

    async fn get_rule(&self, id: &str) -> Result<WorkflowRule, DomainError>;

    async fn list_rules(&self) -> Result<Vec<WorkflowRule>, DomainError>;

    /// Soft delete: the rule stays stored but stops running
    async fn deactivate_rule(&self, id: &str) -> Result<WorkflowRule, DomainError>;

    async fn activate_rule(&self, id: &str) -> Result<WorkflowRule, DomainError>;

    async fn execute(
        &self,
        request: ExecuteRuleRequest,
    ) -> Result<ExecuteRuleResponse, DomainError>;

    async fn list_executions(
        &self,
        rule_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError>;

    async fn get_execution(&self, id: &str) -> Result<WorkflowExecution, DomainError>;

    /// Runs every active rule triggered by the event, then fans it out to webhooks
    async fn handle_lead_event(
        &self,
        event_type: &str,
        lead_id: &str,
        acting_user_id: &str,
    ) -> Result<LeadEventSummary, DomainError>;
}

/// Workflow service backed by rule/execution repositories and the engine
pub struct WorkflowService {
    rules: Arc<dyn WorkflowRuleRepository>,
    executions: Arc<dyn WorkflowExecutionRepository>,
    leads: Arc<dyn LeadRepository>,
    engine: Arc<dyn WorkflowEngine>,
    webhooks: Arc<dyn WebhookServiceTrait>,
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl WorkflowService {
    pub fn new(
        rules: Arc<dyn WorkflowRuleRepository>,
        executions: Arc<dyn WorkflowExecutionRepository>,
        leads: Arc<dyn LeadRepository>,
        engine: Arc<dyn WorkflowEngine>,
        webhooks: Arc<dyn WebhookServiceTrait>,
    ) -> Self {
        Self {
            rules,
            executions,
            leads,
            engine,
            webhooks,
        }
    }

    fn parse_id(&self, id: &str) -> Result<RuleId, DomainError> {
        RuleId::new(id).map_err(DomainError::from)
    }

    async fn load(&self, id: &str) -> Result<WorkflowRule, DomainError> {
        let rule_id = self.parse_id(id)?;
        self.rules
            .get(&rule_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Workflow rule '{}' not found", id)))
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<WorkflowRule, DomainError> {
        let mut rule = self.load(id).await?;
        rule.set_active(active);
        self.rules.update(rule).await
    }
}

#[async_trait]
impl WorkflowServiceTrait for WorkflowService {
    async fn create_rule(&self, request: CreateRuleRequest) -> Result<WorkflowRule, DomainError> {
        let rule_id = self.parse_id(&request.id)?;

        if self.rules.exists(&rule_id).await? {
            return Err(DomainError::conflict(format!(
                "Workflow rule '{}' already exists",
                request.id
            )));
        }

        let mut rule = WorkflowRule::new(rule_id, request.name)
            .with_conditions(request.conditions)
            .with_actions(request.actions)
            .with_active(request.is_active);

        if let Some(description) = request.description {
            rule = rule.with_description(description);
        }
        if let Some(event) = request.trigger_event {
            rule = rule.with_trigger_event(event);
        }

        rule.validate()?;
        self.rules.create(rule).await
    }

    async fn update_rule(
        &self,
        id: &str,
        request: UpdateRuleRequest,
    ) -> Result<WorkflowRule, DomainError> {
        let mut rule = self.load(id).await?;

        if let Some(name) = request.name {
            rule.set_name(name);
        }
        if let Some(description) = request.description {
            rule.set_description(description);
        }
        if let Some(event) = request.trigger_event {
            rule.set_trigger_event(event);
        }
        if let Some(conditions) = request.conditions {
            rule.set_conditions(conditions);
        }
        if let Some(actions) = request.actions {
            rule.set_actions(actions);
        }
        if let Some(active) = request.is_active {
            rule.set_active(active);
        }

        rule.validate()?;
        self.rules.update(rule).await
    }

    async fn get_rule(&self, id: &str) -> Result<WorkflowRule, DomainError> {
        self.load(id).await
    }

    async fn list_rules(&self) -> Result<Vec<WorkflowRule>, DomainError> {
        self.rules.list().await
    }

    async fn deactivate_rule(&self, id: &str) -> Result<WorkflowRule, DomainError> {
        self.set_active(id, false).await
    }

    async fn activate_rule(&self, id: &str) -> Result<WorkflowRule, DomainError> {
        self.set_active(id, true).await
    }

    async fn execute(
        &self,
        request: ExecuteRuleRequest,
    ) -> Result<ExecuteRuleResponse, DomainError> {
        Ok(self.engine.execute(request).await?)
    }

    async fn list_executions(
        &self,
        rule_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError> {
        let rule_id = rule_id.map(|id| self.parse_id(id)).transpose()?;
        self.executions.list(rule_id, limit).await
    }

    async fn get_execution(&self, id: &str) -> Result<WorkflowExecution, DomainError> {
        self.executions
            .get(&ExecutionId::new(id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Execution '{}' not found", id)))
    }

    async fn handle_lead_event(
        &self,
        event_type: &str,
        lead_id: &str,
        acting_user_id: &str,
    ) -> Result<LeadEventSummary, DomainError> {
        let lead_id = LeadId::new(lead_id);
        let lead = self
            .leads
            .find_by_id(&lead_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Lead '{}' not found", lead_id)))?;

        let rules = self.rules.list_by_trigger(event_type).await?;
        let mut runs = Vec::with_capacity(rules.len());

        for rule in rules {
            let request =
                ExecuteRuleRequest::new(rule.id().as_str(), lead_id.as_str(), acting_user_id);
            let response = match self.engine.execute(request).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(
                        rule_id = %rule.id(),
                        lead_id = %lead_id,
                        error = %err,
                        "Triggered rule did not run"
                    );
                    ExecuteRuleResponse::failed(None, err.to_string())
                }
            };
            runs.push(RuleRun {
                rule_id: rule.id().clone(),
                response,
            });
        }

        // Subscribers see the lead as the triggered rules left it
        let lead = match self.leads.find_by_id(&lead_id).await {
            Ok(Some(current)) => current,
            Ok(None) => lead,
            Err(err) => {
                warn!(
                    lead_id = %lead_id,
                    error = %err,
                    "Could not reload lead, notifying with the pre-rule record"
                );
                lead
            }
        };

        let webhooks = self
            .webhooks
            .send_event(event_type, json!({ "lead": lead.to_record() }))
            .await?;

        info!(
            event_type = %event_type,
            lead_id = %lead_id,
            rules_run = runs.len(),
            webhooks_notified = webhooks.len(),
            "Lead event handled"
        );

        Ok(LeadEventSummary {
            event_type: event_type.to_string(),
            lead_id,
            rules: runs,
            webhooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::Lead;
    use crate::domain::workflow::{
        ActionResult, ConditionOperator, ExecutionResult, MockWorkflowEngine,
        UpdateStatusParams, WorkflowError,
    };
    use crate::infrastructure::lead::StorageLeadRepository;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::webhook::{
        StorageWebhookDeliveryLogRepository, StorageWebhookRepository, WebhookService,
    };
    use crate::infrastructure::workflow::{
        StorageWorkflowExecutionRepository, StorageWorkflowRuleRepository,
    };
    use reqwest::Client;

    fn update_status(status: &str) -> Action {
        Action::UpdateStatus(UpdateStatusParams {
            status: status.to_string(),
        })
    }

    fn create_service(
        engine: MockWorkflowEngine,
        executions: Vec<WorkflowExecution>,
    ) -> WorkflowService {
        let webhooks = WebhookService::new(
            Arc::new(StorageWebhookRepository::new(Arc::new(InMemoryStorage::new()))),
            Arc::new(StorageWebhookDeliveryLogRepository::new(Arc::new(
                InMemoryStorage::new(),
            ))),
            Client::new(),
        );

        WorkflowService::new(
            Arc::new(StorageWorkflowRuleRepository::new(Arc::new(
                InMemoryStorage::new(),
            ))),
            Arc::new(StorageWorkflowExecutionRepository::new(Arc::new(
                InMemoryStorage::with_entities(executions),
            ))),
            Arc::new(StorageLeadRepository::new(Arc::new(
                InMemoryStorage::with_entities(vec![Lead::new("lead-1", "Ada", "Lovelace")]),
            ))),
            Arc::new(engine),
            Arc::new(webhooks),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_rule() {
        let service = create_service(MockWorkflowEngine::new(), vec![]);

        let request = CreateRuleRequest::new("qualified-follow-up", "Qualified follow-up")
            .with_trigger_event("lead.status_changed")
            .with_condition(Condition::new(
                "status",
                ConditionOperator::Equals,
                json!("qualified"),
            ))
            .with_action(update_status("contacted"));

        let rule = service.create_rule(request).await.unwrap();
        assert_eq!(rule.id().as_str(), "qualified-follow-up");
        assert!(rule.is_active());

        let fetched = service.get_rule("qualified-follow-up").await.unwrap();
        assert_eq!(fetched.trigger_event(), Some("lead.status_changed"));
        assert_eq!(fetched.actions().len(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_rule() {
        let service = create_service(MockWorkflowEngine::new(), vec![]);

        service
            .create_rule(CreateRuleRequest::new("dup", "First"))
            .await
            .unwrap();
        let result = service.create_rule(CreateRuleRequest::new("dup", "Second")).await;

        assert!(matches!(result, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_rules() {
        let service = create_service(MockWorkflowEngine::new(), vec![]);

        let bad_id = service
            .create_rule(CreateRuleRequest::new("no spaces allowed", "Rule"))
            .await;
        assert!(matches!(bad_id, Err(DomainError::Validation { .. })));

        let bad_operator = service
            .create_rule(
                CreateRuleRequest::new("bad-op", "Rule").with_condition(
                    serde_json::from_value(json!({
                        "field": "status",
                        "operator": "resembles",
                        "value": "x"
                    }))
                    .unwrap(),
                ),
            )
            .await;
        assert!(matches!(bad_operator, Err(DomainError::Validation { .. })));

        let bad_action = service
            .create_rule(
                CreateRuleRequest::new("bad-action", "Rule")
                    .with_action(serde_json::from_value(json!({"type": "teleport"})).unwrap()),
            )
            .await;
        assert!(matches!(bad_action, Err(DomainError::Validation { .. })));

        assert!(service.list_rules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_rule() {
        let service = create_service(MockWorkflowEngine::new(), vec![]);
        service
            .create_rule(CreateRuleRequest::new("r1", "Original"))
            .await
            .unwrap();

        let updated = service
            .update_rule(
                "r1",
                UpdateRuleRequest::new()
                    .with_name("Renamed")
                    .with_actions(vec![update_status("lost")]),
            )
            .await
            .unwrap();
        assert_eq!(updated.name(), "Renamed");
        assert_eq!(updated.actions().len(), 1);

        let invalid = service
            .update_rule("r1", UpdateRuleRequest::new().with_name(""))
            .await;
        assert!(matches!(invalid, Err(DomainError::Validation { .. })));
        assert_eq!(service.get_rule("r1").await.unwrap().name(), "Renamed");

        let missing = service
            .update_rule("nope", UpdateRuleRequest::new().with_name("x"))
            .await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_deactivate_and_activate() {
        let service = create_service(MockWorkflowEngine::new(), vec![]);
        service
            .create_rule(CreateRuleRequest::new("r1", "Rule"))
            .await
            .unwrap();

        let rule = service.deactivate_rule("r1").await.unwrap();
        assert!(!rule.is_active());
        assert_eq!(service.list_rules().await.unwrap().len(), 1);

        let rule = service.activate_rule("r1").await.unwrap();
        assert!(rule.is_active());
    }

    #[tokio::test]
    async fn test_execute_maps_engine_errors() {
        let mut engine = MockWorkflowEngine::new();
        engine
            .expect_execute()
            .returning(|req| Err(WorkflowError::rule_not_found(req.rule_id.clone())));
        let service = create_service(engine, vec![]);

        let result = service
            .execute(ExecuteRuleRequest::new("ghost", "lead-1", "user-1"))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_and_get_executions() {
        let r1 = RuleId::new("r1").unwrap();
        let r2 = RuleId::new("r2").unwrap();
        let mut done = WorkflowExecution::start(r1.clone(), LeadId::new("lead-1"), "user-1");
        done.complete(ExecutionResult::conditions_not_met()).unwrap();
        let other = WorkflowExecution::start(r2, LeadId::new("lead-1"), "user-1");
        let done_id = done.id.clone();

        let service = create_service(MockWorkflowEngine::new(), vec![done, other]);

        assert_eq!(service.list_executions(None, 10).await.unwrap().len(), 2);

        let for_r1 = service.list_executions(Some("r1"), 10).await.unwrap();
        assert_eq!(for_r1.len(), 1);
        assert_eq!(for_r1[0].rule_id, r1);

        let fetched = service.get_execution(done_id.as_str()).await.unwrap();
        assert_eq!(fetched.id, done_id);

        let missing = service.get_execution("exec-missing").await;
        assert!(matches!(missing, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_handle_lead_event_runs_triggered_rules_in_order() {
        let mut engine = MockWorkflowEngine::new();
        engine
            .expect_execute()
            .withf(|req| req.record_id == "lead-1" && req.acting_user_id == "user-1")
            .times(2)
            .returning(|req| {
                if req.rule_id == "b-second" {
                    Err(WorkflowError::Storage("write failed".into()))
                } else {
                    Ok(ExecuteRuleResponse::dispatched(
                        ExecutionId::new("exec-1"),
                        vec![ActionResult::success("update_status", json!({}))],
                    ))
                }
            });
        let service = create_service(engine, vec![]);

        for (id, event) in [
            ("a-first", "lead.created"),
            ("b-second", "lead.created"),
            ("c-other", "lead.status_changed"),
        ] {
            service
                .create_rule(
                    CreateRuleRequest::new(id, id)
                        .with_trigger_event(event)
                        .with_action(update_status("contacted")),
                )
                .await
                .unwrap();
        }

        let summary = service
            .handle_lead_event("lead.created", "lead-1", "user-1")
            .await
            .unwrap();

        assert_eq!(summary.rules.len(), 2);
        assert_eq!(summary.rules[0].rule_id.as_str(), "a-first");
        assert!(summary.rules[0].response.success);
        assert_eq!(summary.rules[1].rule_id.as_str(), "b-second");
        assert!(!summary.rules[1].response.success);
        assert!(summary.webhooks.is_empty());
    }

    #[tokio::test]
    async fn test_handle_lead_event_unknown_lead() {
        let mut engine = MockWorkflowEngine::new();
        engine.expect_execute().times(0);
        let service = create_service(engine, vec![]);

        let result = service
            .handle_lead_event("lead.created", "lead-404", "user-1")
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_lead_event_webhooks_see_record_after_rules() {
        use crate::domain::lead::MockLeadRepository;
        use crate::domain::webhook::Webhook;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        // First lookup precedes the rules, the second follows them
        let lookups = AtomicUsize::new(0);
        let mut leads = MockLeadRepository::new();
        leads.expect_find_by_id().times(2).returning(move |_| {
            let status = if lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                "qualified"
            } else {
                "contacted"
            };
            Ok(Some(Lead::new("lead-1", "Ada", "Lovelace").with_status(status)))
        });

        let mut engine = MockWorkflowEngine::new();
        engine.expect_execute().times(1).returning(|_| {
            Ok(ExecuteRuleResponse::dispatched(
                ExecutionId::new("exec-1"),
                vec![ActionResult::success("update_status", json!({}))],
            ))
        });

        let webhooks = WebhookService::new(
            Arc::new(StorageWebhookRepository::new(Arc::new(InMemoryStorage::new()))),
            Arc::new(StorageWebhookDeliveryLogRepository::new(Arc::new(
                InMemoryStorage::new(),
            ))),
            Client::new(),
        );
        webhooks
            .create(
                Webhook::new("wh-1", "CRM sync", server.uri(), "whsec-test")
                    .with_event("lead.status_changed"),
            )
            .await
            .unwrap();

        let service = WorkflowService::new(
            Arc::new(StorageWorkflowRuleRepository::new(Arc::new(
                InMemoryStorage::new(),
            ))),
            Arc::new(StorageWorkflowExecutionRepository::new(Arc::new(
                InMemoryStorage::new(),
            ))),
            Arc::new(leads),
            Arc::new(engine),
            Arc::new(webhooks),
        );
        service
            .create_rule(
                CreateRuleRequest::new("mark-contacted", "Mark contacted")
                    .with_trigger_event("lead.status_changed")
                    .with_action(update_status("contacted")),
            )
            .await
            .unwrap();

        let summary = service
            .handle_lead_event("lead.status_changed", "lead-1", "user-1")
            .await
            .unwrap();
        assert_eq!(summary.webhooks.len(), 1);
        assert!(summary.webhooks[0].outcome.success);

        let requests = server.received_requests().await.unwrap();
        let envelope: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(envelope["data"]["lead"]["status"], json!("contacted"));
    }
}

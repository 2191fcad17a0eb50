//! Workflow engine implementation

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::lead::{Lead, LeadId, LeadRepository};
use crate::domain::workflow::{
    evaluate, ActionDispatcher, ExecuteRuleRequest, ExecuteRuleResponse, ExecutionContext,
    ExecutionResult, RuleId, WorkflowEngine, WorkflowError, WorkflowExecution, WorkflowRule,
    WorkflowRuleRepository, CONDITIONS_NOT_MET,
};

use super::tracker::ExecutionTracker;

/// Configuration for the workflow engine
#[derive(Debug, Clone)]
pub struct WorkflowEngineConfig {
    /// Deadline for one invocation, shared by every collaborator call in it
    pub invocation_timeout: Duration,
}

impl Default for WorkflowEngineConfig {
    fn default() -> Self {
        Self {
            invocation_timeout: Duration::from_secs(60),
        }
    }
}

/// Runs one rule against one lead: load, track, evaluate, dispatch, finalize
pub struct WorkflowEngineImpl {
    rules: Arc<dyn WorkflowRuleRepository>,
    leads: Arc<dyn LeadRepository>,
    dispatcher: Arc<dyn ActionDispatcher>,
    tracker: ExecutionTracker,
    config: WorkflowEngineConfig,
}

impl std::fmt::Debug for WorkflowEngineImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngineImpl")
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkflowEngineImpl {
    pub fn new(
        rules: Arc<dyn WorkflowRuleRepository>,
        leads: Arc<dyn LeadRepository>,
        dispatcher: Arc<dyn ActionDispatcher>,
        tracker: ExecutionTracker,
    ) -> Self {
        Self {
            rules,
            leads,
            dispatcher,
            tracker,
            config: WorkflowEngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkflowEngineConfig) -> Self {
        self.config = config;
        self
    }

    async fn load_rule(&self, rule_id: &str) -> Result<WorkflowRule, WorkflowError> {
        let id = RuleId::new(rule_id).map_err(|_| WorkflowError::rule_not_found(rule_id))?;

        let rule = self
            .rules
            .get(&id)
            .await?
            .ok_or_else(|| WorkflowError::rule_not_found(rule_id))?;

        if !rule.is_active() {
            return Err(WorkflowError::rule_inactive(rule_id));
        }

        Ok(rule)
    }

    async fn load_record(
        &self,
        record_id: &LeadId,
        ctx: &ExecutionContext,
    ) -> Result<Lead, WorkflowError> {
        ctx.bounded("load_record", self.leads.find_by_id(record_id))
            .await??
            .ok_or_else(|| WorkflowError::record_not_found(record_id.as_str()))
    }

    /// Marks the execution failed; a tracking error here is logged, the original error wins
    async fn abandon(&self, execution: &mut WorkflowExecution, err: &WorkflowError) {
        if let Err(track_err) = self.tracker.fail(execution, err.to_string()).await {
            warn!(
                execution_id = %execution.id,
                error = %track_err,
                "Failed to mark execution as failed"
            );
        }
    }
}

#[async_trait]
impl WorkflowEngine for WorkflowEngineImpl {
    async fn execute(
        &self,
        request: ExecuteRuleRequest,
    ) -> Result<ExecuteRuleResponse, WorkflowError> {
        let start = Instant::now();

        // Configuration errors: no execution is created
        let rule = self.load_rule(&request.rule_id).await?;

        let record_id = LeadId::new(request.record_id.clone());
        let mut execution = self
            .tracker
            .begin(&rule, record_id.clone(), &request.acting_user_id)
            .await?;

        let ctx = ExecutionContext::new(
            execution.id.clone(),
            rule.id().clone(),
            request.acting_user_id.clone(),
            self.config.invocation_timeout,
        );

        let lead = match self.load_record(&record_id, &ctx).await {
            Ok(lead) => lead,
            Err(err) => {
                warn!(
                    execution_id = %execution.id,
                    rule_id = %rule.id(),
                    record_id = %record_id,
                    error = %err,
                    "Record could not be loaded"
                );
                self.abandon(&mut execution, &err).await;
                return Err(err);
            }
        };

        if !evaluate(rule.conditions(), &lead.to_record()) {
            debug!(
                execution_id = %execution.id,
                rule_id = %rule.id(),
                "Conditions not met"
            );
            self.tracker
                .complete(&mut execution, ExecutionResult::conditions_not_met())
                .await?;
            return Ok(ExecuteRuleResponse::skipped(
                execution.id.clone(),
                CONDITIONS_NOT_MET,
            ));
        }

        let mut results = Vec::with_capacity(rule.actions().len());
        for action in rule.actions() {
            results.push(self.dispatcher.execute(action, &lead, &ctx).await);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        self.tracker
            .complete(
                &mut execution,
                ExecutionResult::Actions {
                    actions: results.clone(),
                },
            )
            .await?;

        info!(
            execution_id = %execution.id,
            rule_id = %rule.id(),
            record_id = %record_id,
            actions = results.len(),
            failed_actions = failed,
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Workflow rule executed"
        );

        Ok(ExecuteRuleResponse::dispatched(execution.id.clone(), results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messaging::{MessageId, MockMessagingService};
    use crate::domain::storage::Storage;
    use crate::domain::task::MockTaskRepository;
    use crate::domain::webhook::MockWebhookDeliverer;
    use crate::domain::workflow::{
        Action, ActionResult, Condition, ConditionOperator, ExecutionStatus,
        MockActionDispatcher, UpdateStatusParams, WorkflowExecutionRepository,
    };
    use crate::domain::DomainError;
    use crate::infrastructure::lead::StorageLeadRepository;
    use crate::infrastructure::storage::InMemoryStorage;
    use crate::infrastructure::workflow::{
        ActionDispatcherImpl, StorageWorkflowExecutionRepository, StorageWorkflowRuleRepository,
    };
    use serde_json::json;

    struct Harness {
        engine: WorkflowEngineImpl,
        leads: Arc<StorageLeadRepository>,
        executions: Arc<StorageWorkflowExecutionRepository>,
        execution_storage: Arc<InMemoryStorage<WorkflowExecution>>,
    }

    fn qualified_rule() -> WorkflowRule {
        WorkflowRule::new(RuleId::new("qualified-follow-up").unwrap(), "Qualified follow-up")
            .with_condition(Condition::new(
                "status",
                ConditionOperator::Equals,
                json!("qualified"),
            ))
            .with_action(Action::UpdateStatus(UpdateStatusParams {
                status: "contacted".to_string(),
            }))
    }

    async fn harness(
        rules: Vec<WorkflowRule>,
        dispatcher: Option<Arc<dyn ActionDispatcher>>,
    ) -> Harness {
        let rule_repo = Arc::new(StorageWorkflowRuleRepository::new(Arc::new(
            InMemoryStorage::with_entities(rules),
        )));
        let leads = Arc::new(StorageLeadRepository::new(Arc::new(
            InMemoryStorage::with_entities(vec![
                Lead::new("lead-qualified", "Ada", "Lovelace").with_status("qualified"),
                Lead::new("lead-new", "Alan", "Turing"),
            ]),
        )));
        let execution_storage: Arc<InMemoryStorage<WorkflowExecution>> =
            Arc::new(InMemoryStorage::new());
        let executions = Arc::new(StorageWorkflowExecutionRepository::new(
            execution_storage.clone(),
        ));

        let dispatcher = dispatcher.unwrap_or_else(|| {
            let mut messaging = MockMessagingService::new();
            messaging
                .expect_send()
                .returning(|_| Ok(MessageId::new("msg-1")));
            Arc::new(ActionDispatcherImpl::new(
                leads.clone(),
                Arc::new(MockTaskRepository::new()),
                Arc::new(messaging),
                Arc::new(MockWebhookDeliverer::new()),
            )) as Arc<dyn ActionDispatcher>
        });

        let engine = WorkflowEngineImpl::new(
            rule_repo,
            leads.clone(),
            dispatcher,
            ExecutionTracker::new(executions.clone()),
        );

        Harness {
            engine,
            leads,
            executions,
            execution_storage,
        }
    }

    #[tokio::test]
    async fn test_qualified_lead_is_marked_contacted() {
        let h = harness(vec![qualified_rule()], None).await;

        let response = h
            .engine
            .execute(ExecuteRuleRequest::new(
                "qualified-follow-up",
                "lead-qualified",
                "user-1",
            ))
            .await
            .unwrap();

        assert!(response.success);
        let results = response.results.unwrap();
        assert_eq!(
            results,
            vec![ActionResult::success(
                "update_status",
                json!({"status": "contacted"})
            )]
        );

        let execution = h
            .executions
            .get(response.execution_id.as_ref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.result_data.unwrap().actions().len(), 1);
        assert!(execution.completed_at.is_some());

        let lead = h
            .leads
            .find_by_id(&LeadId::new("lead-qualified"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.status, "contacted");
    }

    #[tokio::test]
    async fn test_new_lead_conditions_not_met() {
        let mut dispatcher = MockActionDispatcher::new();
        dispatcher.expect_execute().times(0);

        let dispatcher: Arc<dyn ActionDispatcher> = Arc::new(dispatcher);
        let h = harness(vec![qualified_rule()], Some(dispatcher)).await;

        let response = h
            .engine
            .execute(ExecuteRuleRequest::new(
                "qualified-follow-up",
                "lead-new",
                "user-1",
            ))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("conditions not met"));
        assert!(response.results.is_none());

        let execution = h
            .executions
            .get(response.execution_id.as_ref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(
            execution.result_data,
            Some(ExecutionResult::conditions_not_met())
        );

        let lead = h
            .leads
            .find_by_id(&LeadId::new("lead-new"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.status, "new");
    }

    #[tokio::test]
    async fn test_failing_action_still_completes() {
        let rule = WorkflowRule::new(RuleId::new("mixed").unwrap(), "Mixed")
            .with_action(serde_json::from_value(json!({"type": "send_email"})).unwrap())
            .with_action(Action::UpdateStatus(UpdateStatusParams {
                status: "contacted".to_string(),
            }))
            .with_action(serde_json::from_value(json!({"type": "teleport"})).unwrap());

        let h = harness(vec![rule], None).await;

        // lead-new has no email address
        let response = h
            .engine
            .execute(ExecuteRuleRequest::new("mixed", "lead-new", "user-1"))
            .await
            .unwrap();

        let results = response.results.unwrap();
        assert_eq!(results.len(), 3);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(results[2].error.as_deref(), Some("Unknown action type"));

        let execution = h
            .executions
            .get(response.execution_id.as_ref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.result_data.unwrap().actions().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_or_inactive_rule_creates_no_execution() {
        let h = harness(vec![qualified_rule().with_active(false)], None).await;

        let result = h
            .engine
            .execute(ExecuteRuleRequest::new("nope", "lead-new", "user-1"))
            .await;
        assert_eq!(result, Err(WorkflowError::rule_not_found("nope")));

        let result = h
            .engine
            .execute(ExecuteRuleRequest::new(
                "qualified-follow-up",
                "lead-qualified",
                "user-1",
            ))
            .await;
        assert_eq!(
            result,
            Err(WorkflowError::rule_inactive("qualified-follow-up"))
        );

        assert_eq!(h.execution_storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_record_fails_execution() {
        let h = harness(vec![qualified_rule()], None).await;

        let result = h
            .engine
            .execute(ExecuteRuleRequest::new(
                "qualified-follow-up",
                "lead-404",
                "user-1",
            ))
            .await;
        assert_eq!(result, Err(WorkflowError::record_not_found("lead-404")));

        let executions = h.executions.list(None, 10).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status, ExecutionStatus::Failed);
        assert_eq!(
            executions[0].error.as_deref(),
            Some("Record not found: lead-404")
        );
    }

    #[tokio::test]
    async fn test_record_store_error_fails_execution() {
        let mut leads = crate::domain::lead::MockLeadRepository::new();
        leads
            .expect_find_by_id()
            .returning(|_| Err(DomainError::storage("replica lag")));

        let executions = Arc::new(StorageWorkflowExecutionRepository::new(Arc::new(
            InMemoryStorage::new(),
        )));
        let engine = WorkflowEngineImpl::new(
            Arc::new(StorageWorkflowRuleRepository::new(Arc::new(
                InMemoryStorage::with_entities(vec![qualified_rule()]),
            ))),
            Arc::new(leads),
            Arc::new(MockActionDispatcher::new()),
            ExecutionTracker::new(executions.clone()),
        );

        let result = engine
            .execute(ExecuteRuleRequest::new(
                "qualified-follow-up",
                "lead-1",
                "user-1",
            ))
            .await;
        assert!(matches!(result, Err(WorkflowError::Storage(_))));

        let stored = executions.list(None, 10).await.unwrap();
        assert_eq!(stored[0].status, ExecutionStatus::Failed);
    }

    #[tokio::test]
    async fn test_webhook_action_finishes_retries_through_engine() {
        use crate::domain::webhook::Webhook;
        use crate::infrastructure::webhook::{
            DeliverySettings, StorageWebhookDeliveryLogRepository, StorageWebhookRepository,
            WebhookService, WebhookServiceTrait,
        };
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(400)))
            .expect(3)
            .mount(&server)
            .await;

        let webhook_service = Arc::new(
            WebhookService::new(
                Arc::new(StorageWebhookRepository::new(Arc::new(InMemoryStorage::new()))),
                Arc::new(StorageWebhookDeliveryLogRepository::new(Arc::new(
                    InMemoryStorage::new(),
                ))),
                reqwest::Client::new(),
            )
            .with_settings(DeliverySettings {
                backoff_base: Duration::ZERO,
                ..DeliverySettings::default()
            }),
        );
        webhook_service
            .create(
                Webhook::new("wh-crm", "CRM sync", server.uri(), "whsec-test")
                    .with_event("workflow.action")
                    .with_retry_count(2)
                    .with_timeout(5),
            )
            .await
            .unwrap();

        let rule = qualified_rule().with_action(
            serde_json::from_value(json!({
                "type": "send_webhook",
                "parameters": {"webhook_id": "wh-crm"}
            }))
            .unwrap(),
        );
        let leads = Arc::new(StorageLeadRepository::new(Arc::new(
            InMemoryStorage::with_entities(vec![
                Lead::new("lead-qualified", "Ada", "Lovelace").with_status("qualified"),
            ]),
        )));
        let executions = Arc::new(StorageWorkflowExecutionRepository::new(Arc::new(
            InMemoryStorage::new(),
        )));
        let dispatcher = ActionDispatcherImpl::new(
            leads.clone(),
            Arc::new(MockTaskRepository::new()),
            Arc::new(MockMessagingService::new()),
            webhook_service.clone(),
        );

        // Three 400ms attempts take longer than the whole invocation budget
        let engine = WorkflowEngineImpl::new(
            Arc::new(StorageWorkflowRuleRepository::new(Arc::new(
                InMemoryStorage::with_entities(vec![rule]),
            ))),
            leads,
            Arc::new(dispatcher),
            ExecutionTracker::new(executions.clone()),
        )
        .with_config(WorkflowEngineConfig {
            invocation_timeout: Duration::from_millis(500),
        });

        let response = engine
            .execute(ExecuteRuleRequest::new(
                "qualified-follow-up",
                "lead-qualified",
                "user-1",
            ))
            .await
            .unwrap();

        let results = response.results.unwrap();
        assert!(results[0].success);
        assert_eq!(results[1].action_type, "send_webhook");
        assert_eq!(
            results[1].error.as_deref(),
            Some("Webhook delivery failed after 3 attempts: HTTP status 500")
        );

        let rows = webhook_service.get_deliveries("wh-crm", 10, 0).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.terminal).count(), 1);
        assert!(rows[0].terminal);

        let webhook = webhook_service.get("wh-crm").await.unwrap();
        assert!(webhook.last_failure_at.is_some());

        let stored = executions.list(None, 10).await.unwrap();
        assert_eq!(stored[0].status, ExecutionStatus::Completed);
    }
}

//! Storage-backed rule and execution repositories

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::storage::Storage;
use crate::domain::workflow::{
    ExecutionId, RuleId, WorkflowExecution, WorkflowExecutionRepository, WorkflowRule,
    WorkflowRuleRepository,
};
use crate::domain::DomainError;

/// Storage-backed implementation of WorkflowRuleRepository
#[derive(Debug)]
pub struct StorageWorkflowRuleRepository {
    storage: Arc<dyn Storage<WorkflowRule>>,
}

impl StorageWorkflowRuleRepository {
    pub fn new(storage: Arc<dyn Storage<WorkflowRule>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl WorkflowRuleRepository for StorageWorkflowRuleRepository {
    async fn get(&self, id: &RuleId) -> Result<Option<WorkflowRule>, DomainError> {
        self.storage.get(id).await
    }

    async fn list(&self) -> Result<Vec<WorkflowRule>, DomainError> {
        let mut rules = self.storage.list().await?;
        rules.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        Ok(rules)
    }

    async fn list_by_trigger(&self, event_type: &str) -> Result<Vec<WorkflowRule>, DomainError> {
        let mut rules: Vec<_> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|r| r.is_triggered_by(event_type))
            .collect();

        // Deterministic order for sequential fan-out
        rules.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().as_str().cmp(b.id().as_str()))
        });
        Ok(rules)
    }

    async fn create(&self, rule: WorkflowRule) -> Result<WorkflowRule, DomainError> {
        if self.storage.exists(rule.id()).await? {
            return Err(DomainError::conflict(format!(
                "Workflow rule '{}' already exists",
                rule.id()
            )));
        }

        self.storage.create(rule).await
    }

    async fn update(&self, rule: WorkflowRule) -> Result<WorkflowRule, DomainError> {
        if !self.storage.exists(rule.id()).await? {
            return Err(DomainError::not_found(format!(
                "Workflow rule '{}' not found",
                rule.id()
            )));
        }

        self.storage.update(rule).await
    }

    async fn exists(&self, id: &RuleId) -> Result<bool, DomainError> {
        self.storage.exists(id).await
    }
}

/// Storage-backed implementation of WorkflowExecutionRepository
#[derive(Debug)]
pub struct StorageWorkflowExecutionRepository {
    storage: Arc<dyn Storage<WorkflowExecution>>,
}

impl StorageWorkflowExecutionRepository {
    pub fn new(storage: Arc<dyn Storage<WorkflowExecution>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl WorkflowExecutionRepository for StorageWorkflowExecutionRepository {
    async fn create(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, DomainError> {
        self.storage.create(execution).await
    }

    async fn update(
        &self,
        execution: WorkflowExecution,
    ) -> Result<WorkflowExecution, DomainError> {
        self.storage.update(execution).await
    }

    async fn get(&self, id: &ExecutionId) -> Result<Option<WorkflowExecution>, DomainError> {
        self.storage.get(id).await
    }

    async fn list(
        &self,
        rule_id: Option<RuleId>,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError> {
        let mut executions: Vec<_> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|e| rule_id.as_ref().is_none_or(|id| &e.rule_id == id))
            .collect();

        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions.truncate(limit);
        Ok(executions)
    }
}

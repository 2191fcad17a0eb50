//! Workflow persistence traits

use async_trait::async_trait;

use super::entity::{RuleId, WorkflowRule};
use super::execution::{ExecutionId, WorkflowExecution};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository trait for rule persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowRuleRepository: Send + Sync {
    async fn get(&self, id: &RuleId) -> Result<Option<WorkflowRule>, DomainError>;

    async fn list(&self) -> Result<Vec<WorkflowRule>, DomainError>;

    /// Active rules whose trigger event matches
    async fn list_by_trigger(&self, event_type: &str) -> Result<Vec<WorkflowRule>, DomainError>;

    async fn create(&self, rule: WorkflowRule) -> Result<WorkflowRule, DomainError>;

    async fn update(&self, rule: WorkflowRule) -> Result<WorkflowRule, DomainError>;

    async fn exists(&self, id: &RuleId) -> Result<bool, DomainError>;
}

/// Repository trait for execution records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowExecutionRepository: Send + Sync {
    async fn create(&self, execution: WorkflowExecution)
    -> Result<WorkflowExecution, DomainError>;

    async fn update(&self, execution: WorkflowExecution)
    -> Result<WorkflowExecution, DomainError>;

    async fn get(&self, id: &ExecutionId) -> Result<Option<WorkflowExecution>, DomainError>;

    /// Executions newest first, optionally filtered by rule
    async fn list(
        &self,
        rule_id: Option<RuleId>,
        limit: usize,
    ) -> Result<Vec<WorkflowExecution>, DomainError>;
}

//! Execution tracker: persists the running/completed/failed lifecycle

use std::sync::Arc;

use tracing::debug;

use crate::domain::lead::LeadId;
use crate::domain::workflow::{
    ExecutionResult, WorkflowError, WorkflowExecution, WorkflowExecutionRepository, WorkflowRule,
};

/// Brackets a rule run with a persistent execution record
#[derive(Clone)]
pub struct ExecutionTracker {
    executions: Arc<dyn WorkflowExecutionRepository>,
}

impl std::fmt::Debug for ExecutionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTracker").finish_non_exhaustive()
    }
}

impl ExecutionTracker {
    pub fn new(executions: Arc<dyn WorkflowExecutionRepository>) -> Self {
        Self { executions }
    }

    /// Creates and stores a `running` execution
    pub async fn begin(
        &self,
        rule: &WorkflowRule,
        record_id: LeadId,
        acting_user_id: &str,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let execution = WorkflowExecution::start(rule.id().clone(), record_id, acting_user_id);

        let execution = self
            .executions
            .create(execution)
            .await
            .map_err(|e| WorkflowError::tracking(e.to_string()))?;

        debug!(
            execution_id = %execution.id,
            rule_id = %execution.rule_id,
            record_id = %execution.record_id,
            "Execution started"
        );
        Ok(execution)
    }

    pub async fn complete(
        &self,
        execution: &mut WorkflowExecution,
        result: ExecutionResult,
    ) -> Result<(), WorkflowError> {
        execution.complete(result)?;
        self.persist(execution).await
    }

    pub async fn fail(
        &self,
        execution: &mut WorkflowExecution,
        error: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        execution.fail(error)?;
        self.persist(execution).await
    }

    async fn persist(&self, execution: &WorkflowExecution) -> Result<(), WorkflowError> {
        self.executions
            .update(execution.clone())
            .await
            .map_err(|e| WorkflowError::tracking(e.to_string()))?;

        debug!(
            execution_id = %execution.id,
            status = execution.status.as_str(),
            "Execution finalized"
        );
        Ok(())
    }
}

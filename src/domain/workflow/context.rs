//! Per-invocation execution context

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::entity::RuleId;
use super::error::WorkflowError;
use super::execution::ExecutionId;

/// Carries the acting user and the invocation deadline through a rule run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    execution_id: ExecutionId,
    rule_id: RuleId,
    acting_user_id: String,
    deadline: Instant,
}

impl ExecutionContext {
    pub fn new(
        execution_id: ExecutionId,
        rule_id: RuleId,
        acting_user_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            execution_id,
            rule_id,
            acting_user_id: acting_user_id.into(),
            deadline: Instant::now() + timeout,
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    pub fn rule_id(&self) -> &RuleId {
        &self.rule_id
    }

    pub fn acting_user_id(&self) -> &str {
        &self.acting_user_id
    }

    /// Runs a collaborator call, failing if the deadline passes first
    pub async fn bounded<F, T>(&self, operation: &str, future: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.deadline, future)
            .await
            .map_err(|_| WorkflowError::deadline_exceeded(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(timeout: Duration) -> ExecutionContext {
        ExecutionContext::new(
            ExecutionId::new("exec-1"),
            RuleId::new("rule-1").unwrap(),
            "user-1",
            timeout,
        )
    }

    #[tokio::test]
    async fn test_bounded_passes_through_value() {
        let ctx = context(Duration::from_secs(5));
        let value = ctx.bounded("lookup", async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let ctx = context(Duration::from_millis(10));

        let result = ctx
            .bounded("send_email", tokio::time::sleep(Duration::from_secs(60)))
            .await;

        assert_eq!(result, Err(WorkflowError::deadline_exceeded("send_email")));
    }
}

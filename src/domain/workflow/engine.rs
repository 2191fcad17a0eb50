//! Workflow engine trait and invocation types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::execution::{ActionResult, ExecutionId};

#[cfg(test)]
use mockall::automock;

/// A manual or event-driven request to run one rule against one lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRuleRequest {
    pub rule_id: String,
    pub record_id: String,
    pub acting_user_id: String,
}

impl ExecuteRuleRequest {
    pub fn new(
        rule_id: impl Into<String>,
        record_id: impl Into<String>,
        acting_user_id: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            record_id: record_id.into(),
            acting_user_id: acting_user_id.into(),
        }
    }
}

/// Engine response; `success` reflects the run itself, not individual actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRuleResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<ExecutionId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ActionResult>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteRuleResponse {
    pub fn dispatched(execution_id: ExecutionId, results: Vec<ActionResult>) -> Self {
        Self {
            success: true,
            execution_id: Some(execution_id),
            results: Some(results),
            message: None,
            error: None,
        }
    }

    pub fn skipped(execution_id: ExecutionId, message: impl Into<String>) -> Self {
        Self {
            success: true,
            execution_id: Some(execution_id),
            results: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(execution_id: Option<ExecutionId>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            execution_id,
            results: None,
            message: None,
            error: Some(error.into()),
        }
    }
}

/// Runs a rule against a record
#[cfg_attr(test, automock)]
#[async_trait]
pub trait WorkflowEngine: Send + Sync + std::fmt::Debug {
    async fn execute(
        &self,
        request: ExecuteRuleRequest,
    ) -> Result<ExecuteRuleResponse, WorkflowError>;
}

//! Execution records bracketing a rule run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entity::RuleId;
use super::error::WorkflowError;
use crate::domain::lead::LeadId;
use crate::domain::storage::{StorageEntity, StorageKey};

/// Message stored when a rule's conditions do not match
pub const CONDITIONS_NOT_MET: &str = "conditions not met";

/// Unique identifier for an execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("exec-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for ExecutionId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for WorkflowExecution {
    type Key = ExecutionId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Outcome of a single dispatched action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: String,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn success(action_type: impl Into<String>, data: Value) -> Self {
        Self {
            action_type: action_type.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(action_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Result payload stored on a completed execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    /// Conditions did not match, nothing was dispatched
    Skipped { message: String },

    /// One entry per attempted action, in rule order
    Actions { actions: Vec<ActionResult> },
}

impl ExecutionResult {
    pub fn conditions_not_met() -> Self {
        Self::Skipped {
            message: CONDITIONS_NOT_MET.to_string(),
        }
    }

    pub fn actions(&self) -> &[ActionResult] {
        match self {
            Self::Actions { actions } => actions,
            Self::Skipped { .. } => &[],
        }
    }
}

/// Persistent record of one rule invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub rule_id: RuleId,
    pub record_id: LeadId,
    pub acting_user_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_data: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    /// A new execution in `running` state
    pub fn start(rule_id: RuleId, record_id: LeadId, acting_user_id: impl Into<String>) -> Self {
        Self {
            id: ExecutionId::generate(),
            rule_id,
            record_id,
            acting_user_id: acting_user_id.into(),
            status: ExecutionStatus::Running,
            result_data: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, result: ExecutionResult) -> Result<(), WorkflowError> {
        self.finish(ExecutionStatus::Completed)?;
        self.result_data = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), WorkflowError> {
        self.finish(ExecutionStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    // Terminal status is set at most once
    fn finish(&mut self, to: ExecutionStatus) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(WorkflowError::invalid_transition(
                self.status.as_str(),
                to.as_str(),
            ));
        }

        self.status = to;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

//! Workflow error types

use thiserror::Error;

use crate::domain::DomainError;

/// Errors returned by the workflow engine and rule management
///
/// Action failures are never represented here; they are recorded as
/// `ActionResult` entries on the execution.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Workflow rule not found: {0}")]
    RuleNotFound(String),

    #[error("Workflow rule is inactive: {0}")]
    RuleInactive(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid execution transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Invocation deadline exceeded during {0}")]
    DeadlineExceeded(String),

    #[error("Execution tracking failed: {0}")]
    Tracking(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn rule_not_found(id: impl Into<String>) -> Self {
        Self::RuleNotFound(id.into())
    }

    pub fn rule_inactive(id: impl Into<String>) -> Self {
        Self::RuleInactive(id.into())
    }

    pub fn record_not_found(id: impl Into<String>) -> Self {
        Self::RecordNotFound(id.into())
    }

    pub fn execution_not_found(id: impl Into<String>) -> Self {
        Self::ExecutionNotFound(id.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn deadline_exceeded(operation: impl Into<String>) -> Self {
        Self::DeadlineExceeded(operation.into())
    }

    pub fn tracking(message: impl Into<String>) -> Self {
        Self::Tracking(message.into())
    }
}

impl From<DomainError> for WorkflowError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } | DomainError::InvalidId { message } => {
                Self::Validation(message)
            }
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<WorkflowError> for DomainError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::RuleNotFound(_)
            | WorkflowError::RecordNotFound(_)
            | WorkflowError::ExecutionNotFound(_) => DomainError::not_found(err.to_string()),
            WorkflowError::RuleInactive(_) => DomainError::validation(err.to_string()),
            WorkflowError::Validation(message) => DomainError::validation(message),
            WorkflowError::Storage(message) => DomainError::storage(message),
            other => DomainError::internal(other.to_string()),
        }
    }
}

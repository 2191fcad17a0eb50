//! Workflow domain module
//!
//! Rules pair an AND-list of conditions with an ordered list of typed
//! actions. The engine evaluates a rule against one lead, dispatches the
//! actions in order, and records the run as a `WorkflowExecution`.

mod action;
mod condition;
mod context;
mod dispatcher;
mod engine;
mod entity;
mod error;
mod execution;
pub mod repository;

pub use action::{
    Action, AssignAgentParams, FollowUpParams, SendEmailParams, SendWebhookParams,
    UpdateStatusParams,
};
pub use condition::{evaluate, Condition, ConditionOperator};
pub use context::ExecutionContext;
pub use dispatcher::ActionDispatcher;
pub use engine::{ExecuteRuleRequest, ExecuteRuleResponse, WorkflowEngine};
pub use entity::{validate_rule_id, RuleId, WorkflowRule, MAX_ID_LENGTH};
pub use error::WorkflowError;
pub use execution::{
    ActionResult, ExecutionId, ExecutionResult, ExecutionStatus, WorkflowExecution,
    CONDITIONS_NOT_MET,
};
pub use repository::{WorkflowExecutionRepository, WorkflowRuleRepository};

#[cfg(test)]
pub use dispatcher::MockActionDispatcher;
#[cfg(test)]
pub use engine::MockWorkflowEngine;
#[cfg(test)]
pub use repository::{MockWorkflowExecutionRepository, MockWorkflowRuleRepository};

//! Action dispatcher trait

use async_trait::async_trait;

use super::action::Action;
use super::context::ExecutionContext;
use super::execution::ActionResult;
use crate::domain::lead::Lead;

#[cfg(test)]
use mockall::automock;

/// Maps one action to its side effect against the collaborators
///
/// Never returns an error: every failure is captured in the `ActionResult`
/// so sibling actions still run.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActionDispatcher: Send + Sync + std::fmt::Debug {
    async fn execute(&self, action: &Action, lead: &Lead, context: &ExecutionContext)
    -> ActionResult;
}

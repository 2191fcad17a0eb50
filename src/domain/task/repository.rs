//! Task store collaborator

use async_trait::async_trait;

use super::{FollowUpTask, TaskId};
use crate::domain::error::DomainError;
use crate::domain::lead::LeadId;

#[cfg(test)]
use mockall::automock;

/// Task/reminder store consumed by workflow actions
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Creates a task or reminder
    async fn create(&self, task: FollowUpTask) -> Result<FollowUpTask, DomainError>;

    /// Finds a task by ID
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<FollowUpTask>, DomainError>;

    /// Lists tasks attached to a lead, soonest due first
    async fn find_by_lead(&self, lead_id: &LeadId) -> Result<Vec<FollowUpTask>, DomainError>;
}

//! Storage-backed task repository

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::lead::LeadId;
use crate::domain::storage::Storage;
use crate::domain::task::{FollowUpTask, TaskId, TaskRepository};
use crate::domain::DomainError;

/// Storage-backed implementation of TaskRepository
#[derive(Debug)]
pub struct StorageTaskRepository {
    storage: Arc<dyn Storage<FollowUpTask>>,
}

impl StorageTaskRepository {
    pub fn new(storage: Arc<dyn Storage<FollowUpTask>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl TaskRepository for StorageTaskRepository {
    async fn create(&self, task: FollowUpTask) -> Result<FollowUpTask, DomainError> {
        self.storage.create(task).await
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<FollowUpTask>, DomainError> {
        self.storage.get(id).await
    }

    async fn find_by_lead(&self, lead_id: &LeadId) -> Result<Vec<FollowUpTask>, DomainError> {
        let mut tasks: Vec<_> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|t| &t.lead_id == lead_id)
            .collect();

        tasks.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        Ok(tasks)
    }
}

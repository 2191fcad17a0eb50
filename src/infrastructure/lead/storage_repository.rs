//! Storage-backed lead repository

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::lead::{Lead, LeadId, LeadRepository};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

/// Storage-backed implementation of LeadRepository
#[derive(Debug)]
pub struct StorageLeadRepository {
    storage: Arc<dyn Storage<Lead>>,
}

impl StorageLeadRepository {
    pub fn new(storage: Arc<dyn Storage<Lead>>) -> Self {
        Self { storage }
    }

    async fn load(&self, id: &LeadId) -> Result<Lead, DomainError> {
        self.storage
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Lead '{}' not found", id)))
    }
}

#[async_trait]
impl LeadRepository for StorageLeadRepository {
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, DomainError> {
        self.storage.get(id).await
    }

    async fn list(&self) -> Result<Vec<Lead>, DomainError> {
        let mut leads = self.storage.list().await?;
        leads.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(leads)
    }

    async fn create(&self, lead: Lead) -> Result<Lead, DomainError> {
        self.storage.create(lead).await
    }

    async fn assign_agent(&self, id: &LeadId, agent_id: &str) -> Result<Lead, DomainError> {
        let mut lead = self.load(id).await?;
        lead.assign_to(agent_id);
        self.storage.update(lead).await
    }

    async fn update_status(&self, id: &LeadId, status: &str) -> Result<Lead, DomainError> {
        let mut lead = self.load(id).await?;
        lead.set_status(status);
        self.storage.update(lead).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryStorage;

    fn repository() -> StorageLeadRepository {
        let storage = InMemoryStorage::with_entities(vec![
            Lead::new("lead-1", "Ada", "Lovelace").with_status("qualified"),
        ]);
        StorageLeadRepository::new(Arc::new(storage))
    }

    #[tokio::test]
    async fn test_update_status() {
        let repo = repository();

        let updated = repo
            .update_status(&LeadId::new("lead-1"), "contacted")
            .await
            .unwrap();
        assert_eq!(updated.status, "contacted");

        let stored = repo.find_by_id(&LeadId::new("lead-1")).await.unwrap().unwrap();
        assert_eq!(stored.status, "contacted");
    }

    #[tokio::test]
    async fn test_assign_agent() {
        let repo = repository();

        repo.assign_agent(&LeadId::new("lead-1"), "agent-42")
            .await
            .unwrap();

        let stored = repo.find_by_id(&LeadId::new("lead-1")).await.unwrap().unwrap();
        assert_eq!(stored.assigned_to.as_deref(), Some("agent-42"));
    }

    #[tokio::test]
    async fn test_mutating_missing_lead_is_not_found() {
        let repo = repository();

        let result = repo.update_status(&LeadId::new("missing"), "lost").await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}

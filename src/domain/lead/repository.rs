//! Lead store collaborator

use async_trait::async_trait;

use super::{Lead, LeadId};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Lead store consumed by the automation core
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Finds a lead by ID
    async fn find_by_id(&self, id: &LeadId) -> Result<Option<Lead>, DomainError>;

    /// Lists all leads
    async fn list(&self) -> Result<Vec<Lead>, DomainError>;

    /// Creates a new lead
    async fn create(&self, lead: Lead) -> Result<Lead, DomainError>;

    /// Reassigns the owning agent
    async fn assign_agent(&self, id: &LeadId, agent_id: &str) -> Result<Lead, DomainError>;

    /// Sets the status field
    async fn update_status(&self, id: &LeadId, status: &str) -> Result<Lead, DomainError>;
}

//! Lead admin endpoints, enough to seed and inspect the records rules act on

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::lead::{Lead, LeadId};
use crate::domain::task::FollowUpTask;

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Anything else becomes a custom field
    #[serde(flatten)]
    pub custom_fields: Map<String, Value>,
}

impl From<CreateLeadRequest> for Lead {
    fn from(req: CreateLeadRequest) -> Self {
        let id = req.id.map(LeadId::new).unwrap_or_else(LeadId::generate);
        let mut lead = Lead::new(id, req.first_name, req.last_name);
        lead.email = req.email;
        lead.phone = req.phone;
        lead.company = req.company;
        lead.source = req.source;
        lead.assigned_to = req.assigned_to;
        lead.custom_fields = req.custom_fields;
        if let Some(status) = req.status {
            lead.set_status(status);
        }
        lead
    }
}

#[derive(Debug, Serialize)]
pub struct ListLeadsResponse {
    pub leads: Vec<Lead>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<FollowUpTask>,
}

/// GET /admin/leads
pub async fn list_leads(
    State(state): State<AppState>,
) -> Result<Json<ListLeadsResponse>, ApiError> {
    let leads = state.lead_repository.list().await?;
    let total = leads.len();
    Ok(Json(ListLeadsResponse { leads, total }))
}

/// POST /admin/leads
pub async fn create_lead(
    State(state): State<AppState>,
    Json(request): Json<CreateLeadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.first_name.trim().is_empty() && request.last_name.trim().is_empty() {
        return Err(
            ApiError::bad_request("Lead needs a first or last name").with_param("first_name"),
        );
    }

    let lead = Lead::from(request);
    debug!(lead_id = %lead.id, "Admin creating lead");

    let created = state.lead_repository.create(lead).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /admin/leads/{lead_id}
pub async fn get_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<Lead>, ApiError> {
    let lead = state
        .lead_repository
        .find_by_id(&LeadId::new(lead_id.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Lead '{}' not found", lead_id)))?;
    Ok(Json(lead))
}

/// GET /admin/leads/{lead_id}/tasks
pub async fn list_lead_tasks(
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<Json<ListTasksResponse>, ApiError> {
    let tasks = state
        .task_repository
        .find_by_lead(&LeadId::new(lead_id))
        .await?;
    Ok(Json(ListTasksResponse { tasks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_become_custom_fields() {
        let req: CreateLeadRequest = serde_json::from_value(json!({
            "id": "lead-1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "status": "qualified",
            "budget": 50000
        }))
        .unwrap();

        let lead = Lead::from(req);
        assert_eq!(lead.id.as_str(), "lead-1");
        assert_eq!(lead.status, "qualified");
        assert_eq!(lead.custom_fields.get("budget"), Some(&json!(50000)));
        assert_eq!(lead.to_record()["budget"], json!(50000));
    }

    #[test]
    fn test_generated_id_and_default_status() {
        let req: CreateLeadRequest = serde_json::from_value(json!({
            "first_name": "Alan",
            "last_name": "Turing"
        }))
        .unwrap();

        let lead = Lead::from(req);
        assert!(lead.id.as_str().starts_with("lead-"));
        assert_eq!(lead.status, "new");
    }
}

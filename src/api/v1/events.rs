//! Lead event intake

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::infrastructure::services::LeadEventSummary;

#[derive(Debug, Clone, Deserialize)]
pub struct LeadEventApiRequest {
    pub event_type: String,
    pub lead_id: String,
    pub acting_user_id: String,
}

/// POST /v1/events
pub async fn handle_event(
    State(state): State<AppState>,
    Json(request): Json<LeadEventApiRequest>,
) -> Result<Json<LeadEventSummary>, ApiError> {
    if request.event_type.trim().is_empty() {
        return Err(ApiError::bad_request("event_type cannot be empty").with_param("event_type"));
    }

    info!(
        event_type = %request.event_type,
        lead_id = %request.lead_id,
        "Lead event received"
    );

    let summary = state
        .workflow_service
        .handle_lead_event(&request.event_type, &request.lead_id, &request.acting_user_id)
        .await?;

    Ok(Json(summary))
}

//! Direct webhook delivery endpoint

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::webhook::{DeliveryOutcome, WebhookId};
use crate::domain::DomainError;

#[derive(Debug, Clone, Deserialize)]
pub struct DeliverApiRequest {
    pub webhook_id: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// POST /v1/webhooks/deliver
pub async fn deliver(
    State(state): State<AppState>,
    Json(request): Json<DeliverApiRequest>,
) -> Result<Json<DeliveryOutcome>, ApiError> {
    debug!(
        webhook_id = %request.webhook_id,
        event_type = %request.event_type,
        "Delivering webhook"
    );

    let outcome = state
        .webhook_service
        .deliver(
            &WebhookId::new(request.webhook_id),
            &request.event_type,
            request.payload,
        )
        .await
        .map_err(DomainError::from)?;

    Ok(Json(outcome))
}

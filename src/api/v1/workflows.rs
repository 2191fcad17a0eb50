//! Rule execution endpoint

use axum::extract::State;
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::workflow::{ExecuteRuleRequest, ExecuteRuleResponse};

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRuleApiRequest {
    pub rule_id: String,
    pub record_id: String,
    pub acting_user_id: String,
}

/// POST /v1/workflows/execute
///
/// Action failures are reported inside the 200 body; only configuration
/// problems (unknown or inactive rule, missing record) become API errors.
pub async fn execute_rule(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRuleApiRequest>,
) -> Result<Json<ExecuteRuleResponse>, ApiError> {
    debug!(
        rule_id = %request.rule_id,
        record_id = %request.record_id,
        "Executing workflow rule"
    );

    let response = state
        .workflow_service
        .execute(ExecuteRuleRequest::new(
            request.rule_id,
            request.record_id,
            request.acting_user_id,
        ))
        .await?;

    Ok(Json(response))
}

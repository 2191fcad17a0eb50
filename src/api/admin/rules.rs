//! Workflow rule admin endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::workflow::{Action, Condition, WorkflowExecution, WorkflowRule};
use crate::infrastructure::services::{CreateRuleRequest, UpdateRuleRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRuleApiRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger_event: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRuleApiRequest {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub trigger_event: Option<Option<String>>,
    pub conditions: Option<Vec<Condition>>,
    pub actions: Option<Vec<Action>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RuleResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub trigger_event: Option<String>,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&WorkflowRule> for RuleResponse {
    fn from(rule: &WorkflowRule) -> Self {
        Self {
            id: rule.id().as_str().to_string(),
            name: rule.name().to_string(),
            description: rule.description().map(String::from),
            trigger_event: rule.trigger_event().map(String::from),
            conditions: rule.conditions().to_vec(),
            actions: rule.actions().to_vec(),
            is_active: rule.is_active(),
            created_at: rule.created_at().to_rfc3339(),
            updated_at: rule.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListRulesResponse {
    pub rules: Vec<RuleResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ListExecutionsResponse {
    pub executions: Vec<WorkflowExecution>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// GET /admin/rules
pub async fn list_rules(
    State(state): State<AppState>,
) -> Result<Json<ListRulesResponse>, ApiError> {
    let rules = state.workflow_service.list_rules().await?;
    let rules: Vec<RuleResponse> = rules.iter().map(RuleResponse::from).collect();
    let total = rules.len();

    Ok(Json(ListRulesResponse { rules, total }))
}

/// POST /admin/rules
pub async fn create_rule(
    State(state): State<AppState>,
    Json(request): Json<CreateRuleApiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(rule_id = %request.id, "Admin creating workflow rule");

    let create_request = CreateRuleRequest {
        id: request.id,
        name: request.name,
        description: request.description,
        trigger_event: request.trigger_event,
        conditions: request.conditions,
        actions: request.actions,
        is_active: request.is_active,
    };

    let rule = state.workflow_service.create_rule(create_request).await?;
    Ok((StatusCode::CREATED, Json(RuleResponse::from(&rule))))
}

/// GET /admin/rules/{rule_id}
pub async fn get_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<Json<RuleResponse>, ApiError> {
    let rule = state.workflow_service.get_rule(&rule_id).await?;
    Ok(Json(RuleResponse::from(&rule)))
}

/// PUT /admin/rules/{rule_id}
pub async fn update_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Json(request): Json<UpdateRuleApiRequest>,
) -> Result<Json<RuleResponse>, ApiError> {
    debug!(rule_id = %rule_id, "Admin updating workflow rule");

    let update_request = UpdateRuleRequest {
        name: request.name,
        description: request.description,
        trigger_event: request.trigger_event,
        conditions: request.conditions,
        actions: request.actions,
        is_active: request.is_active,
    };

    let rule = state
        .workflow_service
        .update_rule(&rule_id, update_request)
        .await?;
    Ok(Json(RuleResponse::from(&rule)))
}

/// DELETE /admin/rules/{rule_id} (deactivates)
pub async fn deactivate_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<Json<RuleResponse>, ApiError> {
    let rule = state.workflow_service.deactivate_rule(&rule_id).await?;
    Ok(Json(RuleResponse::from(&rule)))
}

/// POST /admin/rules/{rule_id}/activate
pub async fn activate_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
) -> Result<Json<RuleResponse>, ApiError> {
    let rule = state.workflow_service.activate_rule(&rule_id).await?;
    Ok(Json(RuleResponse::from(&rule)))
}

/// GET /admin/rules/{rule_id}/executions
pub async fn list_rule_executions(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Query(query): Query<ExecutionsQuery>,
) -> Result<Json<ListExecutionsResponse>, ApiError> {
    // 404 for unknown rules instead of an empty list
    state.workflow_service.get_rule(&rule_id).await?;

    let executions = state
        .workflow_service
        .list_executions(Some(&rule_id), query.limit)
        .await?;
    Ok(Json(ListExecutionsResponse { executions }))
}

/// GET /admin/executions/{execution_id}
pub async fn get_execution(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> Result<Json<WorkflowExecution>, ApiError> {
    let execution = state.workflow_service.get_execution(&execution_id).await?;
    Ok(Json(execution))
}

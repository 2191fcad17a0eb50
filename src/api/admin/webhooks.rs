//! Webhook admin API endpoints

use std::collections::{BTreeSet, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::webhook::{Webhook, WebhookDeliveryAttempt, WebhookId};

/// Request body for create and full update; on update an absent secret keeps the stored one
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    pub events: BTreeSet<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl WebhookRequest {
    fn into_webhook(self, id: WebhookId) -> Webhook {
        let mut webhook = Webhook::new(id, self.name, self.url, self.secret.unwrap_or_default())
            .with_timeout(self.timeout_secs)
            .with_retry_count(self.retry_count)
            .with_active(self.is_active);
        webhook.events = self.events;
        webhook.headers = self.headers;
        webhook
    }
}

/// Webhook as returned by the API; the signing secret never leaves the service
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    pub has_secret: bool,
    pub events: BTreeSet<String>,
    pub headers: HashMap<String, String>,
    pub timeout_secs: u64,
    pub retry_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl From<Webhook> for WebhookResponse {
    fn from(w: Webhook) -> Self {
        Self {
            id: w.id.to_string(),
            name: w.name,
            url: w.url,
            has_secret: !w.secret.is_empty(),
            events: w.events,
            headers: w.headers,
            timeout_secs: w.timeout_secs,
            retry_count: w.retry_count,
            is_active: w.is_active,
            created_at: w.created_at,
            updated_at: w.updated_at,
            last_success_at: w.last_success_at,
            last_failure_at: w.last_failure_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhooksListResponse {
    pub webhooks: Vec<WebhookResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeliveriesListResponse {
    pub deliveries: Vec<WebhookDeliveryAttempt>,
}

#[derive(Debug, Deserialize)]
pub struct DeliveriesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// GET /admin/webhooks
pub async fn list_webhooks(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let webhooks = state.webhook_service.list().await?;
    let total = webhooks.len();

    Ok(Json(WebhooksListResponse {
        webhooks: webhooks.into_iter().map(WebhookResponse::from).collect(),
        total,
    }))
}

/// GET /admin/webhooks/{webhook_id}
pub async fn get_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let webhook = state.webhook_service.get(&id).await?;
    Ok(Json(WebhookResponse::from(webhook)))
}

/// POST /admin/webhooks
pub async fn create_webhook(
    State(state): State<AppState>,
    Json(req): Json<WebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let webhook = req.into_webhook(WebhookId::generate());
    debug!(webhook_id = %webhook.id, "Admin creating webhook");

    let created = state.webhook_service.create(webhook).await?;
    Ok((StatusCode::CREATED, Json(WebhookResponse::from(created))))
}

/// PUT /admin/webhooks/{webhook_id}
pub async fn update_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let webhook = req.into_webhook(WebhookId::new(id.as_str()));
    let updated = state.webhook_service.update(&id, webhook).await?;
    Ok(Json(WebhookResponse::from(updated)))
}

/// DELETE /admin/webhooks/{webhook_id}
pub async fn delete_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.webhook_service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/webhooks/{webhook_id}/deliveries
pub async fn get_deliveries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeliveriesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let deliveries = state
        .webhook_service
        .get_deliveries(&id, query.limit, query.offset)
        .await?;

    Ok(Json(DeliveriesListResponse { deliveries }))
}

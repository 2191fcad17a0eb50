//! Admin API endpoints for rules, webhooks and leads

pub mod leads;
pub mod rules;
pub mod webhooks;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        // Workflow rules
        .route("/rules", get(rules::list_rules).post(rules::create_rule))
        .route(
            "/rules/{rule_id}",
            get(rules::get_rule)
                .put(rules::update_rule)
                .delete(rules::deactivate_rule),
        )
        .route("/rules/{rule_id}/activate", post(rules::activate_rule))
        .route(
            "/rules/{rule_id}/executions",
            get(rules::list_rule_executions),
        )
        .route("/executions/{execution_id}", get(rules::get_execution))
        // Webhooks
        .route(
            "/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route(
            "/webhooks/{webhook_id}",
            get(webhooks::get_webhook)
                .put(webhooks::update_webhook)
                .delete(webhooks::delete_webhook),
        )
        .route(
            "/webhooks/{webhook_id}/deliveries",
            get(webhooks::get_deliveries),
        )
        // Leads
        .route("/leads", get(leads::list_leads).post(leads::create_lead))
        .route("/leads/{lead_id}", get(leads::get_lead))
        .route("/leads/{lead_id}/tasks", get(leads::list_lead_tasks))
}

//! v1 API endpoints: rule execution, webhook delivery and lead events

pub mod events;
pub mod webhooks;
pub mod workflows;

use axum::{routing::post, Router};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/workflows/execute", post(workflows::execute_rule))
        .route("/webhooks/deliver", post(webhooks::deliver))
        .route("/events", post(events::handle_event))
}

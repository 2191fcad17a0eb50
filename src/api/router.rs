use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::admin;
use super::health;
use super::middleware::logging_middleware;
use super::state::AppState;
use super::v1;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Rule execution, webhook delivery and lead events
        .nest("/v1", v1::create_v1_router())
        // Rule, webhook and lead management
        .nest("/admin", admin::create_admin_router())
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::infrastructure::storage::StorageFactory;

    async fn app() -> Router {
        let state = crate::build_app_state(&AppConfig::default(), &StorageFactory::InMemory)
            .await
            .unwrap();
        create_router(state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn seed_qualified_rule(app: &Router) {
        let (status, _) = send(
            app,
            "POST",
            "/admin/leads",
            Some(json!({
                "id": "lead-1",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "status": "qualified"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            app,
            "POST",
            "/admin/rules",
            Some(json!({
                "id": "qualified-follow-up",
                "name": "Qualified follow-up",
                "trigger_event": "lead.status_changed",
                "conditions": [
                    {"field": "status", "operator": "equals", "value": "qualified"}
                ],
                "actions": [
                    {"type": "update_status", "parameters": {"status": "contacted"}},
                    {"type": "create_task", "parameters": {"title": "Book a demo", "priority": "high"}}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app().await;

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, "GET", "/live", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_execute_rule_end_to_end() {
        let app = app().await;
        seed_qualified_rule(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/v1/workflows/execute",
            Some(json!({
                "rule_id": "qualified-follow-up",
                "record_id": "lead-1",
                "acting_user_id": "user-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["results"][0]["action_type"], "update_status");
        assert_eq!(body["results"][0]["success"], true);
        assert_eq!(body["results"][1]["action_type"], "create_task");
        assert_eq!(body["results"][1]["success"], true);

        let (_, lead) = send(&app, "GET", "/admin/leads/lead-1", None).await;
        assert_eq!(lead["status"], "contacted");

        let (_, tasks) = send(&app, "GET", "/admin/leads/lead-1/tasks", None).await;
        assert_eq!(tasks["tasks"][0]["title"], "Book a demo");
        assert_eq!(tasks["tasks"][0]["priority"], "high");
        assert_eq!(tasks["tasks"][0]["assigned_to"], "user-1");

        let (status, executions) = send(
            &app,
            "GET",
            "/admin/rules/qualified-follow-up/executions",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(executions["executions"][0]["status"], "completed");

        let execution_id = body["execution_id"].as_str().unwrap();
        let (status, execution) =
            send(&app, "GET", &format!("/admin/executions/{}", execution_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(execution["record_id"], "lead-1");
    }

    #[tokio::test]
    async fn test_execute_configuration_errors() {
        let app = app().await;
        seed_qualified_rule(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/v1/workflows/execute",
            Some(json!({"rule_id": "ghost", "record_id": "lead-1", "acting_user_id": "u"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");

        let (status, _) = send(&app, "DELETE", "/admin/rules/qualified-follow-up", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            "POST",
            "/v1/workflows/execute",
            Some(json!({
                "rule_id": "qualified-follow-up",
                "record_id": "lead-1",
                "acting_user_id": "u"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("inactive")
        );

        let (status, body) = send(
            &app,
            "POST",
            "/v1/workflows/execute",
            Some(json!({"rule_id": "qualified-follow-up"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "json_parse_error");
    }

    #[tokio::test]
    async fn test_rule_with_unknown_operator_rejected() {
        let app = app().await;

        let (status, body) = send(
            &app,
            "POST",
            "/admin/rules",
            Some(json!({
                "id": "fuzzy",
                "name": "Fuzzy",
                "conditions": [{"field": "status", "operator": "sounds_like", "value": "x"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");

        let (_, rules) = send(&app, "GET", "/admin/rules", None).await;
        assert_eq!(rules["total"], 0);
    }

    #[tokio::test]
    async fn test_lead_event_runs_triggered_rules() {
        let app = app().await;
        seed_qualified_rule(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/v1/events",
            Some(json!({
                "event_type": "lead.status_changed",
                "lead_id": "lead-1",
                "acting_user_id": "user-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rules"][0]["rule_id"], "qualified-follow-up");
        assert_eq!(body["rules"][0]["success"], true);
        assert_eq!(body["webhooks"], json!([]));
    }

    #[tokio::test]
    async fn test_webhook_admin_hides_secret() {
        let app = app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/admin/webhooks",
            Some(json!({
                "name": "CRM sync",
                "url": "https://crm.example.com/hook",
                "secret": "s3cret",
                "events": ["lead.created"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["has_secret"], true);
        assert!(created.get("secret").is_none());

        let id = created["id"].as_str().unwrap();
        let (status, deliveries) =
            send(&app, "GET", &format!("/admin/webhooks/{}/deliveries", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deliveries["deliveries"], json!([]));

        let (status, _) = send(&app, "DELETE", &format!("/admin/webhooks/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/webhooks/deliver",
            Some(json!({"webhook_id": id, "event_type": "lead.created", "payload": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

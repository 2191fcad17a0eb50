//! Webhook domain entities

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::storage::{StorageEntity, StorageKey};

/// Unique identifier for a webhook
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookId(String);

impl WebhookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("wh-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WebhookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for WebhookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl StorageKey for WebhookId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for Webhook {
    type Key = WebhookId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// A subscribed HTTP endpoint
///
/// The secret is stored with the webhook but never appears in `Debug`
/// output, logs or API responses.
#[derive(Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub name: String,
    pub url: String,
    /// Shared HMAC key
    pub secret: String,
    /// Event type strings this webhook subscribes to
    pub events: BTreeSet<String>,
    /// Static headers sent with every delivery
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub retry_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Webhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Webhook")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("secret", &"[REDACTED]")
            .field("events", &self.events)
            .field("headers", &self.headers)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_count", &self.retry_count)
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl Webhook {
    pub fn new(
        id: impl Into<WebhookId>,
        name: impl Into<String>,
        url: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            secret: secret.into(),
            events: BTreeSet::new(),
            headers: HashMap::new(),
            timeout_secs: 30,
            retry_count: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_success_at: None,
            last_failure_at: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.insert(event.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn is_subscribed_to(&self, event_type: &str) -> bool {
        self.events.contains(event_type)
    }

    /// Upper bound on attempts for one logical send
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    pub fn record_success(&mut self) {
        let now = Utc::now();
        self.last_success_at = Some(now);
        self.updated_at = now;
    }

    pub fn record_failure(&mut self) {
        let now = Utc::now();
        self.last_failure_at = Some(now);
        self.updated_at = now;
    }
}

/// Unique identifier for a delivery attempt row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryAttemptId(String);

impl DeliveryAttemptId {
    pub fn generate() -> Self {
        Self(format!("whd-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeliveryAttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for DeliveryAttemptId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl StorageEntity for WebhookDeliveryAttempt {
    type Key = DeliveryAttemptId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

/// One row per HTTP attempt; append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDeliveryAttempt {
    pub id: DeliveryAttemptId,
    pub webhook_id: WebhookId,
    pub event_type: String,
    /// 1-based attempt number within the logical send
    pub attempt: u32,
    /// Envelope as transmitted
    pub payload: Value,
    pub response_status: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub success: bool,
    /// Set on the attempt that ended the logical send
    pub terminal: bool,
    /// Only set on success
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookDeliveryAttempt {
    pub fn succeeded(
        webhook_id: WebhookId,
        event_type: impl Into<String>,
        attempt: u32,
        payload: Value,
        status: u16,
        body: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DeliveryAttemptId::generate(),
            webhook_id,
            event_type: event_type.into(),
            attempt,
            payload,
            response_status: Some(status),
            response_body: body,
            error_message: None,
            success: true,
            terminal: true,
            delivered_at: Some(now),
            created_at: now,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn failed(
        webhook_id: WebhookId,
        event_type: impl Into<String>,
        attempt: u32,
        payload: Value,
        status: Option<u16>,
        body: Option<String>,
        error: impl Into<String>,
        terminal: bool,
    ) -> Self {
        Self {
            id: DeliveryAttemptId::generate(),
            webhook_id,
            event_type: event_type.into(),
            attempt,
            payload,
            response_status: status,
            response_body: body,
            error_message: Some(error.into()),
            success: false,
            terminal,
            delivered_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Body posted to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub webhook_id: WebhookId,
}

impl WebhookEnvelope {
    pub fn new(event: impl Into<String>, data: Value, webhook_id: WebhookId) -> Self {
        Self {
            event: event.into(),
            data,
            timestamp: Utc::now(),
            webhook_id,
        }
    }
}

/// Result of one logical send
///
/// `log_warnings` lists attempt-log writes that failed; they do not change
/// the delivery result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log_warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_secret() {
        let webhook = Webhook::new("wh-1", "CRM sync", "https://example.com/hook", "s3cr3t");
        let debug = format!("{:?}", webhook);
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_subscription_and_attempt_bound() {
        let webhook = Webhook::new("wh-1", "CRM sync", "https://example.com/hook", "s")
            .with_event("lead.created")
            .with_event("lead.created")
            .with_retry_count(2);

        assert_eq!(webhook.events.len(), 1);
        assert!(webhook.is_subscribed_to("lead.created"));
        assert!(!webhook.is_subscribed_to("lead.deleted"));
        assert_eq!(webhook.max_attempts(), 3);
    }

    #[test]
    fn test_attempt_rows() {
        let ok = WebhookDeliveryAttempt::succeeded(
            WebhookId::new("wh-1"),
            "lead.created",
            2,
            json!({}),
            200,
            Some("ok".to_string()),
        );
        assert!(ok.success && ok.terminal);
        assert!(ok.delivered_at.is_some());

        let failed = WebhookDeliveryAttempt::failed(
            WebhookId::new("wh-1"),
            "lead.created",
            1,
            json!({}),
            Some(500),
            None,
            "HTTP 500",
            false,
        );
        assert!(!failed.success && !failed.terminal);
        assert!(failed.delivered_at.is_none());
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = WebhookEnvelope::new("lead.created", json!({"id": 1}), WebhookId::new("wh-1"));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["event"], json!("lead.created"));
        assert_eq!(value["data"]["id"], json!(1));
        assert_eq!(value["webhook_id"], json!("wh-1"));
        assert!(value["timestamp"].is_string());
    }
}

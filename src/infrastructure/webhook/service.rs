//! Webhook service: management, signed delivery with retries, and event fan-out

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::WebhookSettings;
use crate::domain::webhook::signature::{signature_header, SIGNATURE_HEADER};
use crate::domain::webhook::{
    DeliveryOutcome, Webhook, WebhookDeliverer, WebhookDeliveryAttempt,
    WebhookDeliveryLogRepository, WebhookEnvelope, WebhookError, WebhookId, WebhookRepository,
};
use crate::domain::DomainError;

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_RETRY_COUNT: u32 = 10;

/// Set on every delivery; static headers may not override them
const RESERVED_HEADERS: [&str; 4] = [
    "content-type",
    "user-agent",
    "x-webhook-signature",
    "x-webhook-event",
];

/// Delivery result for one subscriber during event fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDelivery {
    pub webhook_id: WebhookId,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

/// Trait for webhook service operations
#[async_trait]
pub trait WebhookServiceTrait: WebhookDeliverer {
    async fn create(&self, webhook: Webhook) -> Result<Webhook, DomainError>;

    /// Replaces a webhook's definition; an empty secret keeps the stored one
    async fn update(&self, id: &str, webhook: Webhook) -> Result<Webhook, DomainError>;

    async fn delete(&self, id: &str) -> Result<(), DomainError>;

    async fn get(&self, id: &str) -> Result<Webhook, DomainError>;

    async fn list(&self) -> Result<Vec<Webhook>, DomainError>;

    /// Delivery attempts for a webhook, newest first
    async fn get_deliveries(
        &self,
        webhook_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<WebhookDeliveryAttempt>, DomainError>;

    /// Delivers an event to every active subscriber
    async fn send_event(
        &self,
        event_type: &str,
        payload: Value,
    ) -> Result<Vec<EventDelivery>, DomainError>;
}

/// Tunables for outbound delivery
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub user_agent: String,
    pub max_response_body_chars: usize,
    /// Delay before retry n (0-based) is `2^n * backoff_base`
    pub backoff_base: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self::from(&WebhookSettings::default())
    }
}

impl From<&WebhookSettings> for DeliverySettings {
    fn from(settings: &WebhookSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            max_response_body_chars: settings.max_response_body_chars,
            backoff_base: Duration::from_millis(settings.backoff_base_ms),
        }
    }
}

impl DeliverySettings {
    /// Wait inserted after the 0-based attempt `attempt` fails
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

/// What happened on one HTTP attempt
enum AttemptResult {
    Delivered { status: u16, body: Option<String> },
    Failed {
        status: Option<u16>,
        body: Option<String>,
        error: String,
    },
}

/// Webhook service implementation
pub struct WebhookService<W: WebhookRepository, D: WebhookDeliveryLogRepository> {
    webhook_repo: Arc<W>,
    delivery_repo: Arc<D>,
    http_client: Client,
    settings: DeliverySettings,
}

impl<W: WebhookRepository, D: WebhookDeliveryLogRepository> std::fmt::Debug
    for WebhookService<W, D>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookService")
            .field("settings", &self.settings)
            .finish()
    }
}

impl<W: WebhookRepository, D: WebhookDeliveryLogRepository> WebhookService<W, D> {
    pub fn new(webhook_repo: Arc<W>, delivery_repo: Arc<D>, http_client: Client) -> Self {
        Self {
            webhook_repo,
            delivery_repo,
            http_client,
            settings: DeliverySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DeliverySettings) -> Self {
        self.settings = settings;
        self
    }

    fn validate(webhook: &Webhook) -> Result<(), DomainError> {
        if webhook.name.trim().is_empty() {
            return Err(DomainError::validation("Name is required"));
        }

        if webhook.url.is_empty() {
            return Err(DomainError::validation("URL is required"));
        }

        if !webhook.url.starts_with("http://") && !webhook.url.starts_with("https://") {
            return Err(DomainError::validation(
                "URL must start with http:// or https://",
            ));
        }

        if webhook.secret.is_empty() {
            return Err(DomainError::validation("Secret is required"));
        }

        if webhook.events.is_empty() {
            return Err(DomainError::validation(
                "At least one event must be subscribed",
            ));
        }

        if webhook.timeout_secs == 0 || webhook.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(DomainError::validation(format!(
                "timeout_secs must be between 1 and {}",
                MAX_TIMEOUT_SECS
            )));
        }

        if webhook.retry_count > MAX_RETRY_COUNT {
            return Err(DomainError::validation(format!(
                "retry_count must be at most {}",
                MAX_RETRY_COUNT
            )));
        }

        for (name, value) in &webhook.headers {
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                DomainError::validation(format!("Invalid header name '{}'", name))
            })?;

            if RESERVED_HEADERS.contains(&header.as_str()) {
                return Err(DomainError::validation(format!(
                    "Header '{}' is set by the delivery service",
                    name
                )));
            }

            HeaderValue::from_str(value).map_err(|_| {
                DomainError::validation(format!("Invalid value for header '{}'", name))
            })?;
        }

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Webhook, DomainError> {
        self.webhook_repo
            .find_by_id(&WebhookId::new(id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Webhook '{}' not found", id)))
    }

    /// One POST of the already-serialized envelope
    async fn send_attempt(
        &self,
        webhook: &Webhook,
        event_type: &str,
        body: &[u8],
        signature: &str,
    ) -> AttemptResult {
        let timeout = Duration::from_secs(webhook.timeout_secs);

        let mut request = self
            .http_client
            .post(&webhook.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", &self.settings.user_agent)
            .header(SIGNATURE_HEADER, signature)
            .header("X-Webhook-Event", event_type);

        for (key, value) in &webhook.headers {
            request = request.header(key, value);
        }

        let max_chars = self.settings.max_response_body_chars;
        let exchange = async {
            let response = request.body(body.to_vec()).send().await?;
            let status = response.status().as_u16();
            let text = response.text().await.ok();
            Ok::<_, reqwest::Error>((status, text))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok((status, text))) => {
                let body = text.map(|b| b.chars().take(max_chars).collect::<String>());

                if (200..300).contains(&status) {
                    AttemptResult::Delivered { status, body }
                } else {
                    AttemptResult::Failed {
                        status: Some(status),
                        body,
                        error: format!("HTTP status {}", status),
                    }
                }
            }
            Ok(Err(e)) => {
                let error = if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    "Connection failed".to_string()
                } else {
                    format!("Request failed: {}", e)
                };
                AttemptResult::Failed {
                    status: None,
                    body: None,
                    error,
                }
            }
            Err(_) => AttemptResult::Failed {
                status: None,
                body: None,
                error: "Request timed out".to_string(),
            },
        }
    }

    async fn log_attempt(&self, row: WebhookDeliveryAttempt, warnings: &mut Vec<String>) {
        let attempt = row.attempt;
        let webhook_id = row.webhook_id.clone();

        if let Err(e) = self.delivery_repo.append(row).await {
            warn!(
                webhook_id = %webhook_id,
                attempt = attempt,
                error = %e,
                "Failed to record webhook delivery attempt"
            );
            warnings.push(format!("Failed to record attempt {}: {}", attempt, e));
        }
    }

    /// Best effort: a failure here never changes the delivery outcome
    async fn record_webhook_result(&self, webhook_id: &WebhookId, success: bool) {
        match self
            .webhook_repo
            .record_delivery_result(webhook_id, success)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(webhook_id = %webhook_id, "Webhook removed during delivery"),
            Err(e) => {
                warn!(webhook_id = %webhook_id, error = %e, "Failed to update webhook delivery status")
            }
        }
    }
}

#[async_trait]
impl<W: WebhookRepository, D: WebhookDeliveryLogRepository> WebhookDeliverer
    for WebhookService<W, D>
{
    async fn deliver(
        &self,
        webhook_id: &WebhookId,
        event_type: &str,
        payload: Value,
    ) -> Result<DeliveryOutcome, WebhookError> {
        let webhook = self
            .webhook_repo
            .find_by_id(webhook_id)
            .await?
            .ok_or_else(|| WebhookError::not_found(webhook_id.as_str()))?;

        if !webhook.is_active {
            return Err(WebhookError::inactive(webhook_id.as_str()));
        }

        if !webhook.is_subscribed_to(event_type) {
            return Err(WebhookError::not_subscribed(webhook_id.as_str(), event_type));
        }

        // Serialize once; the signature covers exactly these bytes
        let envelope = WebhookEnvelope::new(event_type, payload, webhook.id.clone());
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| WebhookError::serialization(e.to_string()))?;
        let snapshot = serde_json::to_value(&envelope)
            .map_err(|e| WebhookError::serialization(e.to_string()))?;
        let signature = signature_header(&body, &webhook.secret)?;

        let max_attempts = webhook.max_attempts();
        let mut log_warnings = Vec::new();
        let mut last_status = None;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.settings.backoff_delay(attempt - 1);
                debug!(
                    webhook_id = %webhook.id,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before webhook retry"
                );
                tokio::time::sleep(delay).await;
            }

            let number = attempt + 1;
            match self
                .send_attempt(&webhook, event_type, &body, &signature)
                .await
            {
                AttemptResult::Delivered { status, body } => {
                    info!(
                        webhook_id = %webhook.id,
                        event_type = %event_type,
                        attempt = number,
                        status = status,
                        "Webhook delivery succeeded"
                    );

                    let row = WebhookDeliveryAttempt::succeeded(
                        webhook.id.clone(),
                        event_type,
                        number,
                        snapshot.clone(),
                        status,
                        body,
                    );
                    self.log_attempt(row, &mut log_warnings).await;
                    self.record_webhook_result(&webhook.id, true).await;

                    return Ok(DeliveryOutcome {
                        success: true,
                        status: Some(status),
                        attempts: number,
                        error: None,
                        log_warnings,
                    });
                }
                AttemptResult::Failed {
                    status,
                    body,
                    error,
                } => {
                    warn!(
                        webhook_id = %webhook.id,
                        event_type = %event_type,
                        attempt = number,
                        max_attempts = max_attempts,
                        error = %error,
                        "Webhook delivery attempt failed"
                    );

                    let row = WebhookDeliveryAttempt::failed(
                        webhook.id.clone(),
                        event_type,
                        number,
                        snapshot.clone(),
                        status,
                        body,
                        error.clone(),
                        number == max_attempts,
                    );
                    self.log_attempt(row, &mut log_warnings).await;

                    last_status = status;
                    last_error = Some(error);
                }
            }
        }

        self.record_webhook_result(&webhook.id, false).await;

        Ok(DeliveryOutcome {
            success: false,
            status: last_status,
            attempts: max_attempts,
            error: last_error,
            log_warnings,
        })
    }
}

#[async_trait]
impl<W: WebhookRepository, D: WebhookDeliveryLogRepository> WebhookServiceTrait
    for WebhookService<W, D>
{
    async fn create(&self, webhook: Webhook) -> Result<Webhook, DomainError> {
        Self::validate(&webhook)?;

        let created = self.webhook_repo.create(webhook).await?;
        info!(webhook_id = %created.id, url = %created.url, "Webhook created");
        Ok(created)
    }

    async fn update(&self, id: &str, mut webhook: Webhook) -> Result<Webhook, DomainError> {
        let existing = self.load(id).await?;

        // Preserve immutable fields
        webhook.id = existing.id;
        webhook.created_at = existing.created_at;
        webhook.last_success_at = existing.last_success_at;
        webhook.last_failure_at = existing.last_failure_at;
        webhook.updated_at = Utc::now();

        if webhook.secret.is_empty() {
            webhook.secret = existing.secret;
        }

        Self::validate(&webhook)?;
        self.webhook_repo.update(webhook).await
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        if !self.webhook_repo.delete(&WebhookId::new(id)).await? {
            return Err(DomainError::not_found(format!("Webhook '{}' not found", id)));
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Webhook, DomainError> {
        self.load(id).await
    }

    async fn list(&self) -> Result<Vec<Webhook>, DomainError> {
        self.webhook_repo.list().await
    }

    async fn get_deliveries(
        &self,
        webhook_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<WebhookDeliveryAttempt>, DomainError> {
        let webhook = self.load(webhook_id).await?;
        self.delivery_repo
            .find_by_webhook(&webhook.id, limit, offset)
            .await
    }

    async fn send_event(
        &self,
        event_type: &str,
        payload: Value,
    ) -> Result<Vec<EventDelivery>, DomainError> {
        let webhooks = self.webhook_repo.find_active_by_event(event_type).await?;
        let mut deliveries = Vec::with_capacity(webhooks.len());

        for webhook in webhooks {
            let outcome = match self.deliver(&webhook.id, event_type, payload.clone()).await {
                Ok(outcome) => outcome,
                // Deactivated or unsubscribed since the lookup
                Err(e) => DeliveryOutcome {
                    success: false,
                    status: None,
                    attempts: 0,
                    error: Some(e.to_string()),
                    log_warnings: Vec::new(),
                },
            };

            deliveries.push(EventDelivery {
                webhook_id: webhook.id,
                outcome,
            });
        }

        info!(
            event_type = %event_type,
            deliveries = deliveries.len(),
            "Webhook event dispatched"
        );

        Ok(deliveries)
    }
}

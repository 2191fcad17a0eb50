//! HTTP email provider client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::MessagingSettings;
use crate::domain::messaging::{MessageId, MessagingService, OutboundMessage};
use crate::domain::DomainError;

const SERVICE: &str = "messaging";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// Posts messages to a JSON email provider endpoint
#[derive(Debug, Clone)]
pub struct HttpMessagingService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
    timeout: Duration,
}

impl HttpMessagingService {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            from_address: from_address.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Builds the client from settings; `None` when no endpoint is configured
    pub fn from_settings(client: Client, settings: &MessagingSettings) -> Option<Self> {
        let endpoint = settings.endpoint.as_ref()?;
        let mut service = Self::new(client, endpoint.clone(), settings.from_address.clone())
            .with_timeout(Duration::from_secs(settings.timeout_secs));

        if let Some(key) = &settings.api_key {
            service = service.with_api_key(key.clone());
        }

        Some(service)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl MessagingService for HttpMessagingService {
    async fn send(&self, message: OutboundMessage) -> Result<MessageId, DomainError> {
        let body = SendRequest {
            from: &self.from_address,
            to: &message.to,
            subject: &message.subject,
            content: &message.content,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                "Connection failed".to_string()
            } else {
                e.to_string()
            };
            warn!(to = %body.to, error = %message, "Email provider request failed");
            DomainError::collaborator(SERVICE, message)
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(200).collect();
            return Err(DomainError::collaborator(
                SERVICE,
                format!("Provider returned {}: {}", status.as_u16(), text),
            ));
        }

        let parsed: SendResponse = response.json().await.map_err(|e| {
            DomainError::collaborator(SERVICE, format!("Invalid provider response: {}", e))
        })?;

        debug!(message_id = %parsed.id, "Email accepted by provider");
        Ok(MessageId::new(parsed.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> OutboundMessage {
        OutboundMessage::new("lead@example.com", "Follow-up", "Hello")
    }

    #[tokio::test]
    async fn test_send_returns_provider_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer key-1"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({"id": "m-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let service = HttpMessagingService::new(
            Client::new(),
            format!("{}/send", server.uri()),
            "noreply@example.com",
        )
        .with_api_key("key-1");

        let id = service.send(message()).await.unwrap();
        assert_eq!(id.as_str(), "m-1");
    }

    #[tokio::test]
    async fn test_send_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("mailbox rejected"))
            .mount(&server)
            .await;

        let service = HttpMessagingService::new(Client::new(), server.uri(), "noreply@example.com");

        let err = service.send(message()).await.unwrap_err();
        assert!(err.to_string().contains("422"));
        assert!(err.to_string().contains("mailbox rejected"));
    }

    #[test]
    fn test_from_settings_requires_endpoint() {
        let settings = MessagingSettings::default();
        assert!(HttpMessagingService::from_settings(Client::new(), &settings).is_none());
    }
}

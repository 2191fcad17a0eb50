use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
    #[serde(default)]
    pub messaging: MessagingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storage backend selection (`memory` or `postgres`)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Workflow engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSettings {
    /// Overall deadline for one engine invocation, inherited by collaborator calls
    pub invocation_timeout_secs: u64,
}

/// Outbound webhook delivery settings
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub user_agent: String,
    pub max_response_body_chars: usize,
    /// Base unit of the exponential backoff (delay = 2^attempt * base)
    pub backoff_base_ms: u64,
}

/// Messaging provider settings. Without an endpoint, messages go to the in-process outbox.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingSettings {
    pub from_address: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_messaging_timeout")]
    pub timeout_secs: u64,
}

fn default_messaging_timeout() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            invocation_timeout_secs: 60,
        }
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("LeadFlow-Webhooks/{}", env!("CARGO_PKG_VERSION")),
            max_response_body_chars: 1000,
            backoff_base_ms: 1000,
        }
    }
}

impl Default for MessagingSettings {
    fn default() -> Self {
        Self {
            from_address: "no-reply@leadflow.local".to_string(),
            endpoint: None,
            api_key: None,
            timeout_secs: default_messaging_timeout(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

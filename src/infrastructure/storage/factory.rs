//! Storage factory for runtime backend selection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::config::StorageSettings;
use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::{PostgresConfig, PostgresStorage};

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (development and tests)
    InMemory,
    /// PostgreSQL JSONB storage
    Postgres,
}

impl StorageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Opened storage backend that hands out one storage per entity table
#[derive(Debug, Clone)]
pub enum StorageFactory {
    InMemory,
    Postgres(PgPool),
}

impl StorageFactory {
    /// Opens the backend described by the settings
    ///
    /// For postgres the URL comes from `storage.database_url` or `DATABASE_URL`.
    pub async fn connect(settings: &StorageSettings) -> Result<Self, DomainError> {
        let storage_type = StorageType::parse(&settings.backend).ok_or_else(|| {
            DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                settings.backend
            ))
        })?;

        match storage_type {
            StorageType::InMemory => {
                info!("Using in-memory storage");
                Ok(Self::InMemory)
            }
            StorageType::Postgres => {
                let url = settings
                    .database_url
                    .clone()
                    .or_else(|| std::env::var("DATABASE_URL").ok())
                    .ok_or_else(|| {
                        DomainError::configuration(
                            "storage.database_url or DATABASE_URL is required for postgres",
                        )
                    })?;

                info!("Connecting to PostgreSQL...");
                let pool = PostgresConfig::new(url)
                    .with_max_connections(settings.max_connections)
                    .connect()
                    .await?;
                info!("PostgreSQL connection established");

                Ok(Self::Postgres(pool))
            }
        }
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }

    /// Creates the storage for one entity type, preparing its table when needed
    pub async fn create<E>(&self, table_name: &str) -> Result<Arc<dyn Storage<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        match self {
            Self::InMemory => Ok(Arc::new(InMemoryStorage::<E>::new())),
            Self::Postgres(pool) => {
                let storage = PostgresStorage::<E>::new(pool.clone(), table_name)?;
                storage.ensure_table().await?;
                Ok(Arc::new(storage))
            }
        }
    }
}

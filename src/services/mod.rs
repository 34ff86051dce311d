//! Business logic services

pub mod catalog;
pub mod identity;
pub mod lending;

use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::{AppConfig, DatabaseConfig, DirectoryKind, LendingConfig, StorageBackend},
    error::AppResult,
    repository::{CatalogStore, MemoryCatalogStore, PgCatalogStore, RedisCatalogStore, UsersRepository},
};

use identity::{DirectoryIdentityService, IdentityService, StaticIdentityService};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
}

impl Services {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityService>,
        lending: &LendingConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store, identity, lending),
        }
    }

    /// Connect the configured store and identity backends
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let needs_database = config.storage.backend == StorageBackend::Postgres
            || config.auth.directory == DirectoryKind::Database;
        let pool = if needs_database {
            Some(connect_database(&config.database).await?)
        } else {
            None
        };

        let store: Arc<dyn CatalogStore> = match (config.storage.backend, &pool) {
            (StorageBackend::Postgres, Some(pool)) => Arc::new(PgCatalogStore::new(pool.clone())),
            (StorageBackend::Redis, _) => {
                let store = RedisCatalogStore::connect(&config.redis.url).await?;
                tracing::info!("Connected to Redis");
                Arc::new(store)
            }
            _ => {
                tracing::warn!("Using in-memory catalog store, data is lost on restart");
                Arc::new(MemoryCatalogStore::new())
            }
        };

        let identity: Arc<dyn IdentityService> = match (config.auth.directory, pool) {
            (DirectoryKind::Database, Some(pool)) => {
                Arc::new(DirectoryIdentityService::new(UsersRepository::new(pool)))
            }
            _ => {
                tracing::info!(
                    "Using static librarian list ({} entries)",
                    config.auth.librarians.len()
                );
                Arc::new(StaticIdentityService::new(config.auth.librarians.iter().cloned()))
            }
        };

        Ok(Self::new(store, identity, &config.lending))
    }
}

async fn connect_database(config: &DatabaseConfig) -> AppResult<Pool<Postgres>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(&config.url)
        .await?;
    tracing::info!("Connected to database");

    PgCatalogStore::new(pool.clone()).migrate().await?;
    tracing::info!("Database migrations completed");

    Ok(pool)
}

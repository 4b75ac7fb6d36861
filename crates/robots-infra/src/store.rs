//! Backend selection.
//!
//! `FleetStore` lets the binary pick a repository at runtime from
//! configuration while `FleetManager` stays generic over one concrete type.

use std::path::Path;

use anyhow::Context;
use robots_core::repository::FleetRepository;
use robots_types::config::StorageBackend;
use robots_types::error::RepositoryError;
use robots_types::fleet::Fleet;
use robots_types::robot::Robot;

use crate::json::JsonFleetRepository;
use crate::sqlite::fleet::SqliteFleetRepository;
use crate::sqlite::pool::{DatabasePool, database_url};

/// One of the supported fleet repositories.
pub enum FleetStore {
    Json(JsonFleetRepository),
    Sqlite(SqliteFleetRepository),
}

impl FleetStore {
    /// Open the configured backend inside `data_dir`, creating the directory if needed.
    pub async fn open(backend: StorageBackend, data_dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let store = match backend {
            StorageBackend::Json => FleetStore::Json(JsonFleetRepository::new(data_dir)),
            StorageBackend::Sqlite => {
                let url = database_url(data_dir);
                let pool = DatabasePool::new(&url)
                    .await
                    .with_context(|| format!("Failed to open database at {url}"))?;
                FleetStore::Sqlite(SqliteFleetRepository::new(pool))
            }
        };

        tracing::debug!(%backend, data_dir = %data_dir.display(), "fleet store opened");
        Ok(store)
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            FleetStore::Json(_) => StorageBackend::Json,
            FleetStore::Sqlite(_) => StorageBackend::Sqlite,
        }
    }
}

impl FleetRepository for FleetStore {
    async fn load(&self) -> Result<Fleet, RepositoryError> {
        match self {
            FleetStore::Json(repo) => repo.load().await,
            FleetStore::Sqlite(repo) => repo.load().await,
        }
    }

    async fn save(&self, fleet: &Fleet) -> Result<(), RepositoryError> {
        match self {
            FleetStore::Json(repo) => repo.save(fleet).await,
            FleetStore::Sqlite(repo) => repo.save(fleet).await,
        }
    }

    async fn get(&self, name: &str) -> Result<Option<Robot>, RepositoryError> {
        match self {
            FleetStore::Json(repo) => repo.get(name).await,
            FleetStore::Sqlite(repo) => repo.get(name).await,
        }
    }

    async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        match self {
            FleetStore::Json(repo) => repo.delete(name).await,
            FleetStore::Sqlite(repo) => repo.delete(name).await,
        }
    }

    async fn modify<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send,
        E: From<RepositoryError> + Send,
        F: FnOnce(&mut Fleet) -> Result<T, E> + Send,
    {
        match self {
            FleetStore::Json(repo) => repo.modify(f).await,
            FleetStore::Sqlite(repo) => repo.modify(f).await,
        }
    }
}

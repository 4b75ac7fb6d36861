//! Application state wiring the fleet manager and transport together.
//!
//! AppState holds the concrete instances used by both the CLI and the REST
//! API. `FleetManager` is generic over the repository trait; AppState pins
//! it to `FleetStore`, whose backend comes from `fleet-config.toml`.

use std::path::PathBuf;
use std::sync::Arc;

use robots_core::service::manager::FleetManager;
use robots_infra::config::{load_fleet_config, resolve_data_dir};
use robots_infra::store::FleetStore;
use robots_infra::transport::ssh::SshTransport;
use robots_types::config::FleetConfig;

/// Concrete type alias for the manager pinned to the configured store.
pub type ConcreteFleetManager = FleetManager<FleetStore>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub fleet_manager: Arc<ConcreteFleetManager>,
    pub transport: Arc<SshTransport>,
    pub config: Arc<FleetConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load configuration and open the store.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        let config = load_fleet_config(&data_dir).await;
        Self::with_config(data_dir, config).await
    }

    /// Build state from an explicit configuration.
    pub async fn with_config(data_dir: PathBuf, config: FleetConfig) -> anyhow::Result<Self> {
        let store = FleetStore::open(config.storage.backend, &data_dir).await?;
        let transport = SshTransport::new(&config);

        tracing::debug!(
            data_dir = %data_dir.display(),
            backend = %config.storage.backend,
            "application state ready"
        );

        Ok(Self {
            fleet_manager: Arc::new(FleetManager::new(store)),
            transport: Arc::new(transport),
            config: Arc::new(config),
            data_dir,
        })
    }
}

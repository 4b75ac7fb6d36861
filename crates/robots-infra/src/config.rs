//! Fleet configuration loader and data directory resolution.
//!
//! Reads `fleet-config.toml` from the data directory (`~/.robots/` in
//! production) and deserializes it into [`FleetConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use robots_types::config::FleetConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "ROBOTS_DATA_DIR";

/// Configuration file name inside the data directory.
pub const CONFIG_FILE: &str = "fleet-config.toml";

/// Load fleet configuration from `{data_dir}/fleet-config.toml`.
///
/// - If the file does not exist, returns [`FleetConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
pub async fn load_fleet_config(data_dir: &Path) -> FleetConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return FleetConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return FleetConfig::default();
        }
    };

    match toml::from_str::<FleetConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            FleetConfig::default()
        }
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `ROBOTS_DATA_DIR` environment variable
/// 2. `~/.robots`
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(override_dir: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
        return dir;
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".robots");
    }

    // Last resort: current directory
    PathBuf::from(".robots")
}

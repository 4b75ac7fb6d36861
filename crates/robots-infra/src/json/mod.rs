//! Flat JSON file fleet repository.
//!
//! The whole fleet lives in `{data_dir}/robots.json`: one object keyed by
//! robot name whose values are the robots' flat records (core attributes and
//! aspects inlined). Each save writes its own uniquely named temp file next to
//! the document and renames it over the original, so neither a crash nor two
//! concurrent writers leave a torn document. There is no locking: two
//! processes saving at the same time will silently overwrite each other.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use robots_core::repository::FleetRepository;
use robots_types::error::RepositoryError;
use robots_types::fleet::Fleet;
use robots_types::robot::{AttributeValue, Robot};

/// File name of the fleet document inside the data directory.
pub const FLEET_FILE: &str = "robots.json";

/// On-disk shape: robot name -> flat record.
type FleetDocument = BTreeMap<String, BTreeMap<String, AttributeValue>>;

/// JSON-file-backed implementation of `FleetRepository`.
pub struct JsonFleetRepository {
    path: PathBuf,
}

impl JsonFleetRepository {
    /// Repository for `{data_dir}/robots.json`.
    pub fn new(data_dir: &Path) -> Self {
        Self::at_path(data_dir.join(FLEET_FILE))
    }

    /// Repository for an explicit file path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, e: std::io::Error) -> RepositoryError {
        RepositoryError::Io(format!("{}: {e}", self.path.display()))
    }

    async fn read_document(&self) -> Result<Option<FleetDocument>, RepositoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No fleet file at {}, starting empty", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(self.io_err(err)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content).map(Some).map_err(|e| {
            RepositoryError::Serialization(format!("{}: {e}", self.path.display()))
        })
    }

    async fn write_document(&self, document: &FleetDocument) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| self.io_err(e))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(json.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::Io(format!("fleet write task failed: {e}")))?
        .map_err(|e| self.io_err(e))
    }
}

fn to_document(fleet: &Fleet) -> FleetDocument {
    fleet
        .robots()
        .map(|robot| (robot.name().to_string(), robot.to_record().into_iter().collect()))
        .collect()
}

fn robot_from_entry(
    key: String,
    mut record: BTreeMap<String, AttributeValue>,
) -> Result<Robot, RepositoryError> {
    // The key is authoritative for the name; records written by hand may omit it.
    record.insert("name".to_string(), AttributeValue::Text(key.clone()));
    Robot::from_record(record)
        .map_err(|e| RepositoryError::Serialization(format!("invalid robot '{key}': {e}")))
}

impl FleetRepository for JsonFleetRepository {
    async fn load(&self) -> Result<Fleet, RepositoryError> {
        let Some(document) = self.read_document().await? else {
            return Ok(Fleet::new());
        };

        let mut fleet = Fleet::new();
        for (key, record) in document {
            let robot = robot_from_entry(key, record)?;
            fleet
                .insert(robot)
                .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
        }

        tracing::debug!(robots = fleet.len(), path = %self.path.display(), "fleet loaded");
        Ok(fleet)
    }

    async fn save(&self, fleet: &Fleet) -> Result<(), RepositoryError> {
        self.write_document(&to_document(fleet)).await?;
        tracing::debug!(robots = fleet.len(), path = %self.path.display(), "fleet saved");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Robot>, RepositoryError> {
        let Some(mut document) = self.read_document().await? else {
            return Ok(None);
        };
        document
            .remove(name)
            .map(|record| robot_from_entry(name.to_string(), record))
            .transpose()
    }

    async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        let mut document = self.read_document().await?.unwrap_or_default();
        if document.remove(name).is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.write_document(&document).await
    }
}

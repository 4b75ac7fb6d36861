//! Fleet management service.
//!
//! Reads load the current fleet from the repository. Mutations go through
//! [`FleetRepository::modify`], which persists the fleet only if it changed.
//! They are also serialized by an async mutex so concurrent requests in one
//! process (the REST server) cannot overwrite each other's snapshot.

use std::collections::BTreeMap;

use robots_types::error::{FleetError, RepositoryError};
use robots_types::fleet::Fleet;
use robots_types::robot::{
    AttributeValue, CreateRobotRequest, Robot, RobotRecord, RobotStatus, coerce_input,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::aspect::{self, AspectReport};
use crate::query::{self, QueryWarning, RobotTable};
use crate::repository::FleetRepository;

/// Parameters for a listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {
    /// Attribute name -> required raw value, ANDed.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Append aspect columns.
    #[serde(default)]
    pub detailed: bool,
    #[serde(default)]
    pub sort_by: Option<String>,
}

/// A rendered listing plus anything the caller should tell the user about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotListing {
    pub table: RobotTable,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<QueryWarning>,
}

/// Orchestrates the fleet operations over any [`FleetRepository`].
pub struct FleetManager<R: FleetRepository> {
    repo: R,
    write_lock: Mutex<()>,
}

impl<R: FleetRepository> FleetManager<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            write_lock: Mutex::new(()),
        }
    }

    /// Borrow the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    async fn load(&self) -> Result<Fleet, FleetError> {
        Ok(self.repo.load().await?)
    }

    async fn find(&self, name: &str) -> Result<Robot, FleetError> {
        self.repo
            .get(name)
            .await?
            .ok_or_else(|| FleetError::NotFound(name.to_string()))
    }

    /// Register a new robot. Blank optional fields are treated as unset.
    pub async fn create_robot(&self, request: CreateRobotRequest) -> Result<Robot, FleetError> {
        let mut robot = Robot::new(request.name, request.model)?;
        if let Some(hostname) = non_blank(request.hostname) {
            robot = robot.with_hostname(hostname);
        }
        if let Some(location) = non_blank(request.location) {
            robot = robot.with_location(location);
        }

        let _guard = self.write_lock.lock().await;
        self.repo
            .modify(|fleet| fleet.insert(robot.clone()))
            .await?;

        tracing::info!(robot = robot.name(), model = %robot.model, "robot created");
        Ok(robot)
    }

    /// Apply raw attribute updates to one robot.
    ///
    /// Values go through [`coerce_input`]. Updates are applied to a copy; the
    /// first rejected update aborts the edit and nothing is saved.
    pub async fn edit_robot(
        &self,
        name: &str,
        updates: BTreeMap<String, String>,
    ) -> Result<Robot, FleetError> {
        let _guard = self.write_lock.lock().await;
        let robot = self
            .repo
            .modify(|fleet| {
                let mut robot = fleet
                    .get(name)
                    .cloned()
                    .ok_or_else(|| FleetError::NotFound(name.to_string()))?;
                for (key, raw) in &updates {
                    robot.set_attribute(key, coerce_input(key, raw))?;
                }
                fleet.update(robot.clone())?;
                Ok::<_, FleetError>(robot)
            })
            .await?;

        tracing::info!(
            robot = name,
            attributes = ?updates.keys().collect::<Vec<_>>(),
            "robot updated"
        );
        Ok(robot)
    }

    /// The robot's flattened record.
    pub async fn inspect_robot(&self, name: &str) -> Result<RobotRecord, FleetError> {
        Ok(self.find(name).await?.to_record())
    }

    pub async fn get_status(&self, name: &str) -> Result<RobotStatus, FleetError> {
        let robot = self.find(name).await?;
        Ok(RobotStatus {
            name: robot.name().to_string(),
            status: robot.status,
            location: robot.location,
        })
    }

    /// Filter, sort and project the fleet.
    pub async fn list_robots(&self, request: &ListRequest) -> Result<RobotListing, FleetError> {
        let fleet = self.load().await?;
        if fleet.is_empty() {
            return Err(FleetError::NoRobots);
        }

        let mut robots = query::filter(&fleet, &request.filters);
        if robots.is_empty() {
            return Err(FleetError::NoMatches);
        }

        let mut warnings = Vec::new();
        if let Some(attribute) = &request.sort_by {
            warnings.extend(query::sort_by(&mut robots, attribute));
        }

        Ok(RobotListing {
            table: query::project(&robots, request.detailed),
            warnings,
        })
    }

    /// Add an aspect to every robot. `default` is a raw value; `None` is null.
    pub async fn add_aspect(
        &self,
        aspect: &str,
        default: Option<&str>,
    ) -> Result<AspectReport, FleetError> {
        let default = default
            .map(|raw| coerce_input(aspect, raw))
            .unwrap_or(AttributeValue::Null);

        let _guard = self.write_lock.lock().await;
        let report = self
            .repo
            .modify(|fleet| {
                if fleet.is_empty() {
                    return Err(FleetError::NoRobots);
                }
                Ok(aspect::add_aspect_to_fleet(fleet, aspect, default))
            })
            .await?;

        log_aspect_change(&report);
        Ok(report)
    }

    /// Remove an aspect from every robot that carries it.
    pub async fn remove_aspect(&self, aspect: &str) -> Result<AspectReport, FleetError> {
        let _guard = self.write_lock.lock().await;
        let report = self
            .repo
            .modify(|fleet| {
                if fleet.is_empty() {
                    return Err(FleetError::NoRobots);
                }
                Ok(aspect::remove_aspect_from_fleet(fleet, aspect))
            })
            .await?;

        log_aspect_change(&report);
        Ok(report)
    }

    /// Permanently remove a robot.
    pub async fn delete_robot(&self, name: &str) -> Result<(), FleetError> {
        let _guard = self.write_lock.lock().await;
        self.repo.delete(name).await.map_err(|e| match e {
            RepositoryError::NotFound => FleetError::NotFound(name.to_string()),
            other => FleetError::from(other),
        })?;

        tracing::info!(robot = name, "robot deleted");
        Ok(())
    }

    /// Host a transport should use to reach the robot.
    pub async fn resolve_hostname(&self, name: &str) -> Result<String, FleetError> {
        let robot = self.find(name).await?;
        match robot.hostname {
            Some(host) if !host.trim().is_empty() => Ok(host),
            _ => Err(FleetError::MissingHostname(name.to_string())),
        }
    }
}

// The fleet only changes, and is only saved, when `report.needs_save()`.
fn log_aspect_change(report: &AspectReport) {
    if !report.failures.is_empty() {
        tracing::warn!(
            aspect = %report.aspect,
            failed = report.failures.len(),
            "aspect change skipped some robots"
        );
    }
    tracing::info!(
        aspect = %report.aspect,
        updated = report.updated,
        "fleet-wide aspect change finished"
    );
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // --- In-memory repository for testing ---

    #[derive(Default)]
    struct MemoryRepository {
        fleet: StdMutex<Fleet>,
        saves: AtomicUsize,
    }

    impl MemoryRepository {
        fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        fn snapshot(&self) -> Fleet {
            self.fleet.lock().unwrap().clone()
        }
    }

    impl FleetRepository for MemoryRepository {
        async fn load(&self) -> Result<Fleet, RepositoryError> {
            Ok(self.fleet.lock().unwrap().clone())
        }

        async fn save(&self, fleet: &Fleet) -> Result<(), RepositoryError> {
            *self.fleet.lock().unwrap() = fleet.clone();
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get(&self, name: &str) -> Result<Option<Robot>, RepositoryError> {
            Ok(self.fleet.lock().unwrap().get(name).cloned())
        }

        async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
            self.fleet
                .lock()
                .unwrap()
                .remove(name)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }
    }

    /// A repository whose disk is always gone.
    struct BrokenRepository;

    impl FleetRepository for BrokenRepository {
        async fn load(&self) -> Result<Fleet, RepositoryError> {
            Err(RepositoryError::Io("disk unplugged".to_string()))
        }

        async fn save(&self, _fleet: &Fleet) -> Result<(), RepositoryError> {
            Err(RepositoryError::Io("disk unplugged".to_string()))
        }

        async fn get(&self, _name: &str) -> Result<Option<Robot>, RepositoryError> {
            Err(RepositoryError::Io("disk unplugged".to_string()))
        }

        async fn delete(&self, _name: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::Io("disk unplugged".to_string()))
        }
    }

    fn request(name: &str, model: &str) -> CreateRobotRequest {
        CreateRobotRequest {
            name: name.to_string(),
            model: model.to_string(),
            hostname: None,
            location: None,
        }
    }

    fn updates(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn manager_with(names: &[&str]) -> FleetManager<MemoryRepository> {
        let manager = FleetManager::new(MemoryRepository::default());
        for name in names {
            manager.create_robot(request(name, "mk1")).await.unwrap();
        }
        manager
    }

    #[tokio::test]
    async fn test_create_robot_persists() {
        let manager = manager_with(&[]).await;
        let robot = manager
            .create_robot(CreateRobotRequest {
                hostname: Some("atlas.local".to_string()),
                location: Some("".to_string()),
                ..request("atlas", "mk2")
            })
            .await
            .unwrap();

        assert_eq!(robot.hostname.as_deref(), Some("atlas.local"));
        assert!(robot.location.is_none());
        assert_eq!(robot.status, "idle");
        assert!(!robot.deployed);
        assert!(manager.repository().snapshot().contains("atlas"));
    }

    #[tokio::test]
    async fn test_create_duplicate_leaves_fleet_unchanged() {
        let manager = manager_with(&["atlas"]).await;
        let before = manager.repository().snapshot();
        let saves = manager.repository().save_count();

        let err = manager.create_robot(request("atlas", "other")).await.unwrap_err();
        assert!(matches!(err, FleetError::AlreadyExists(name) if name == "atlas"));
        assert_eq!(manager.repository().snapshot(), before);
        assert_eq!(manager.repository().save_count(), saves);
    }

    #[tokio::test]
    async fn test_edit_then_inspect_round_trip() {
        let manager = manager_with(&["atlas", "bolt"]).await;

        manager.edit_robot("atlas", updates(&[("color", "red")])).await.unwrap();
        let record = manager.inspect_robot("atlas").await.unwrap();
        assert_eq!(record.get("color"), Some(&AttributeValue::from("red")));

        manager.add_aspect("color", None).await.unwrap();
        manager.remove_aspect("color").await.unwrap();
        let record = manager.inspect_robot("atlas").await.unwrap();
        assert!(!record.contains_key("color"));
    }

    #[tokio::test]
    async fn test_edit_coerces_deployed() {
        let manager = manager_with(&["atlas"]).await;
        let robot = manager
            .edit_robot("atlas", updates(&[("deployed", "TRUE"), ("status", "online")]))
            .await
            .unwrap();

        assert!(robot.deployed);
        assert_eq!(robot.status, "online");
        assert!(manager.repository().snapshot().get("atlas").unwrap().deployed);
    }

    #[tokio::test]
    async fn test_edit_failure_saves_nothing() {
        let manager = manager_with(&["atlas"]).await;
        let saves = manager.repository().save_count();

        let err = manager
            .edit_robot("atlas", updates(&[("color", "red"), ("deployed", "maybe")]))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::InvalidValue { .. }));
        assert_eq!(manager.repository().save_count(), saves);
        assert!(!manager.repository().snapshot().get("atlas").unwrap().has_aspect("color"));
    }

    #[tokio::test]
    async fn test_edit_to_same_value_skips_save() {
        let manager = manager_with(&["atlas"]).await;
        let saves = manager.repository().save_count();

        let robot = manager
            .edit_robot("atlas", updates(&[("status", "idle")]))
            .await
            .unwrap();
        assert_eq!(robot.status, "idle");
        assert_eq!(manager.repository().save_count(), saves);
    }

    #[tokio::test]
    async fn test_edit_unknown_robot() {
        let manager = manager_with(&[]).await;
        let err = manager.edit_robot("ghost", updates(&[("status", "x")])).await.unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_status() {
        let manager = manager_with(&["atlas"]).await;
        manager.edit_robot("atlas", updates(&[("location", "bay 3")])).await.unwrap();

        let status = manager.get_status("atlas").await.unwrap();
        assert_eq!(status.status, "idle");
        assert_eq!(status.location.as_deref(), Some("bay 3"));
        assert!(matches!(
            manager.get_status("ghost").await,
            Err(FleetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_distinguishes_empty_results() {
        let manager = manager_with(&[]).await;
        assert!(matches!(
            manager.list_robots(&ListRequest::default()).await,
            Err(FleetError::NoRobots)
        ));

        manager.create_robot(request("atlas", "mk1")).await.unwrap();
        let req = ListRequest {
            filters: updates(&[("status", "online")]),
            ..Default::default()
        };
        assert!(matches!(manager.list_robots(&req).await, Err(FleetError::NoMatches)));
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_projects() {
        let manager = manager_with(&["a", "b", "c"]).await;
        manager.edit_robot("a", updates(&[("status", "online"), ("zone", "2")])).await.unwrap();
        manager.edit_robot("c", updates(&[("status", "online"), ("zone", "1")])).await.unwrap();

        let listing = manager
            .list_robots(&ListRequest {
                filters: updates(&[("status", "online")]),
                detailed: true,
                sort_by: Some("zone".to_string()),
            })
            .await
            .unwrap();

        let names: Vec<_> = listing.table.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a"]);
        assert_eq!(listing.table.headers.last().unwrap(), "zone");
        assert!(listing.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_list_unknown_sort_attribute_warns() {
        let manager = manager_with(&["b", "a"]).await;
        let listing = manager
            .list_robots(&ListRequest {
                sort_by: Some("firmware".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            listing.warnings,
            vec![QueryWarning::UnknownSortAttribute("firmware".to_string())]
        );
        assert_eq!(listing.table.rows.len(), 2);
    }

    #[tokio::test]
    async fn test_add_aspect_saves_only_when_something_changed() {
        let manager = manager_with(&["a", "b"]).await;
        let saves = manager.repository().save_count();

        let first = manager.add_aspect("battery", Some("100")).await.unwrap();
        assert_eq!(first.updated, 2);
        assert_eq!(manager.repository().save_count(), saves + 1);

        let second = manager.add_aspect("battery", Some("100")).await.unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.failures.len(), 2);
        assert_eq!(manager.repository().save_count(), saves + 1);

        let record = manager.inspect_robot("b").await.unwrap();
        assert_eq!(record.get("battery"), Some(&AttributeValue::from("100")));
    }

    #[tokio::test]
    async fn test_add_core_attribute_changes_nothing() {
        let manager = manager_with(&["a", "b"]).await;
        let report = manager.add_aspect("status", Some("x")).await.unwrap();
        assert_eq!(report.updated, 0);
        assert_eq!(report.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_aspect_ops_on_empty_fleet() {
        let manager = manager_with(&[]).await;
        assert!(matches!(
            manager.add_aspect("battery", None).await,
            Err(FleetError::NoRobots)
        ));
        assert!(matches!(
            manager.remove_aspect("battery").await,
            Err(FleetError::NoRobots)
        ));
    }

    #[tokio::test]
    async fn test_delete_robot() {
        let manager = manager_with(&["atlas"]).await;
        manager.delete_robot("atlas").await.unwrap();
        assert!(manager.repository().snapshot().is_empty());
        assert!(matches!(
            manager.delete_robot("atlas").await,
            Err(FleetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_hostname() {
        let manager = manager_with(&["bare"]).await;
        manager
            .create_robot(CreateRobotRequest {
                hostname: Some("atlas.local".to_string()),
                ..request("atlas", "mk1")
            })
            .await
            .unwrap();

        assert_eq!(manager.resolve_hostname("atlas").await.unwrap(), "atlas.local");
        assert!(matches!(
            manager.resolve_hostname("bare").await,
            Err(FleetError::MissingHostname(_))
        ));
        assert!(matches!(
            manager.resolve_hostname("ghost").await,
            Err(FleetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_storage_errors_surface() {
        let manager = FleetManager::new(BrokenRepository);
        let err = manager.create_robot(request("atlas", "mk1")).await.unwrap_err();
        assert!(matches!(err, FleetError::StorageError(msg) if msg.contains("disk unplugged")));
        assert!(matches!(
            manager.list_robots(&ListRequest::default()).await,
            Err(FleetError::StorageError(_))
        ));
    }
}

//! SQLite fleet repository implementation.
//!
//! Implements `FleetRepository` from `robots-core` with one row per robot in
//! `robots` and one row per aspect in `robot_aspects`. Aspect values are
//! stored as JSON text so strings, booleans and nulls survive a round trip.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use robots_core::repository::FleetRepository;
use robots_types::error::RepositoryError;
use robots_types::fleet::Fleet;
use robots_types::robot::{AttributeValue, Robot};
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `FleetRepository`.
pub struct SqliteFleetRepository {
    pool: DatabasePool,
}

impl SqliteFleetRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to a domain Robot.
struct RobotRow {
    name: String,
    model: String,
    hostname: Option<String>,
    status: String,
    deployed: bool,
    location: Option<String>,
}

impl RobotRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            name: row.try_get("name")?,
            model: row.try_get("model")?,
            hostname: row.try_get("hostname")?,
            status: row.try_get("status")?,
            deployed: row.try_get("deployed")?,
            location: row.try_get("location")?,
        })
    }

    fn into_robot(
        self,
        aspects: Vec<(String, AttributeValue)>,
    ) -> Result<Robot, RepositoryError> {
        let invalid = |e: robots_types::error::FleetError| {
            RepositoryError::Serialization(format!("invalid robot '{}': {e}", self.name))
        };

        let mut robot = Robot::new(self.name.clone(), self.model.clone()).map_err(invalid)?;
        robot.hostname = self.hostname.clone();
        robot.status = self.status.clone();
        robot.deployed = self.deployed;
        robot.location = self.location.clone();
        for (name, value) in aspects {
            robot.set_attribute(&name, value).map_err(invalid)?;
        }
        Ok(robot)
    }
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn decode_value(raw: &str) -> Result<AttributeValue, RepositoryError> {
    serde_json::from_str(raw)
        .map_err(|e| RepositoryError::Serialization(format!("invalid aspect value JSON: {e}")))
}

fn encode_value(value: &AttributeValue) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

/// Read every robot and its aspects on one connection.
///
/// Callers run this inside a transaction so both queries see the same state.
async fn read_fleet(conn: &mut SqliteConnection) -> Result<Fleet, RepositoryError> {
    let rows = sqlx::query("SELECT * FROM robots ORDER BY name")
        .fetch_all(&mut *conn)
        .await
        .map_err(query_err)?;

    let aspect_rows = sqlx::query("SELECT robot_name, name, value FROM robot_aspects")
        .fetch_all(&mut *conn)
        .await
        .map_err(query_err)?;

    let mut aspects: BTreeMap<String, Vec<(String, AttributeValue)>> = BTreeMap::new();
    for row in &aspect_rows {
        let robot_name: String = row.try_get("robot_name").map_err(query_err)?;
        let name: String = row.try_get("name").map_err(query_err)?;
        let value: String = row.try_get("value").map_err(query_err)?;
        aspects
            .entry(robot_name)
            .or_default()
            .push((name, decode_value(&value)?));
    }

    let mut fleet = Fleet::new();
    for row in &rows {
        let robot_row = RobotRow::from_row(row).map_err(query_err)?;
        let robot_aspects = aspects.remove(&robot_row.name).unwrap_or_default();
        let robot = robot_row.into_robot(robot_aspects)?;
        fleet
            .insert(robot)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
    }

    if !aspects.is_empty() {
        tracing::warn!(
            robots = ?aspects.keys().collect::<Vec<_>>(),
            "ignoring aspect rows without a robot"
        );
    }

    Ok(fleet)
}

/// Turn `before` into `after`: delete robots `after` dropped and rewrite the
/// ones that differ. Unchanged robots are not touched.
async fn write_changes(
    conn: &mut SqliteConnection,
    before: &Fleet,
    after: &Fleet,
) -> Result<(), RepositoryError> {
    let now = Utc::now().to_rfc3339();

    let keep: BTreeSet<&str> = after.names().collect();
    for name in before.names().filter(|n| !keep.contains(n)) {
        sqlx::query("DELETE FROM robots WHERE name = ?")
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(query_err)?;
    }

    for robot in after.robots() {
        if before.get(robot.name()) == Some(robot) {
            continue;
        }

        sqlx::query(
            "INSERT INTO robots (name, model, hostname, status, deployed, location, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                model = excluded.model,
                hostname = excluded.hostname,
                status = excluded.status,
                deployed = excluded.deployed,
                location = excluded.location,
                updated_at = excluded.updated_at",
        )
        .bind(robot.name())
        .bind(&robot.model)
        .bind(&robot.hostname)
        .bind(&robot.status)
        .bind(robot.deployed)
        .bind(&robot.location)
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .map_err(query_err)?;

        sqlx::query("DELETE FROM robot_aspects WHERE robot_name = ?")
            .bind(robot.name())
            .execute(&mut *conn)
            .await
            .map_err(query_err)?;

        for (name, value) in robot.aspects() {
            sqlx::query("INSERT INTO robot_aspects (robot_name, name, value) VALUES (?, ?, ?)")
                .bind(robot.name())
                .bind(name)
                .bind(encode_value(value)?)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e {
                        if db_err.message().contains("UNIQUE") {
                            return RepositoryError::Conflict(format!(
                                "aspect '{name}' duplicated on robot '{}'",
                                robot.name()
                            ));
                        }
                    }
                    query_err(e)
                })?;
        }
    }

    Ok(())
}

impl SqliteFleetRepository {
    /// Open a write transaction that already holds the database write lock.
    ///
    /// A plain `BEGIN` is deferred: another process could commit between our
    /// read and our first write. The no-op update takes the lock up front.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        sqlx::query("UPDATE robots SET updated_at = updated_at WHERE 0")
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        Ok(tx)
    }
}

impl FleetRepository for SqliteFleetRepository {
    async fn load(&self) -> Result<Fleet, RepositoryError> {
        let mut tx = self.pool.reader.begin().await.map_err(query_err)?;
        let fleet = read_fleet(&mut tx).await?;
        tx.commit().await.map_err(query_err)?;

        tracing::debug!(robots = fleet.len(), "fleet loaded from sqlite");
        Ok(fleet)
    }

    async fn save(&self, fleet: &Fleet) -> Result<(), RepositoryError> {
        // One transaction per snapshot: other processes see the old fleet or the new one.
        let mut tx = self.begin_write().await?;
        let stored = read_fleet(&mut tx).await?;
        write_changes(&mut tx, &stored, fleet).await?;
        tx.commit().await.map_err(query_err)?;

        tracing::debug!(robots = fleet.len(), "fleet saved to sqlite");
        Ok(())
    }

    /// Load, mutate and write back inside one write transaction.
    ///
    /// Only robots `f` removed are deleted, so robots other processes wrote
    /// before the lock was taken survive.
    async fn modify<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send,
        E: From<RepositoryError> + Send,
        F: FnOnce(&mut Fleet) -> Result<T, E> + Send,
    {
        let mut tx = self.begin_write().await?;
        let before = read_fleet(&mut tx).await?;

        let mut fleet = before.clone();
        // Dropping `tx` on error rolls back.
        let out = f(&mut fleet)?;

        if fleet != before {
            write_changes(&mut tx, &before, &fleet).await?;
        }
        tx.commit().await.map_err(query_err)?;

        tracing::debug!(robots = fleet.len(), "fleet modified in sqlite");
        Ok(out)
    }

    async fn get(&self, name: &str) -> Result<Option<Robot>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM robots WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let aspect_rows = sqlx::query("SELECT name, value FROM robot_aspects WHERE robot_name = ?")
            .bind(name)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut aspects = Vec::with_capacity(aspect_rows.len());
        for aspect_row in &aspect_rows {
            let aspect: String = aspect_row.try_get("name").map_err(query_err)?;
            let value: String = aspect_row.try_get("value").map_err(query_err)?;
            aspects.push((aspect, decode_value(&value)?));
        }

        let robot_row = RobotRow::from_row(&row).map_err(query_err)?;
        Ok(Some(robot_row.into_robot(aspects)?))
    }

    async fn delete(&self, name: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM robots WHERE name = ?")
            .bind(name)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::database_url;

    async fn test_repo() -> SqliteFleetRepository {
        let dir = tempfile::tempdir().unwrap();
        let url = database_url(dir.path());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        SqliteFleetRepository::new(DatabasePool::new(&url).await.unwrap())
    }

    /// Two repositories with their own pools over one database file.
    async fn shared_repos(
        dir: &std::path::Path,
    ) -> (SqliteFleetRepository, SqliteFleetRepository) {
        let url = database_url(dir);
        let a = SqliteFleetRepository::new(DatabasePool::new(&url).await.unwrap());
        let b = SqliteFleetRepository::new(DatabasePool::new(&url).await.unwrap());
        (a, b)
    }

    fn sample_fleet() -> Fleet {
        let mut atlas = Robot::new("atlas", "mk2")
            .unwrap()
            .with_hostname("atlas.local")
            .with_location("bay 3");
        atlas.deployed = true;
        atlas.set_attribute("battery", "100".into()).unwrap();
        atlas.set_attribute("charging", true.into()).unwrap();
        atlas.set_attribute("notes", AttributeValue::Null).unwrap();

        let bolt = Robot::new("bolt", "mk1").unwrap();
        Fleet::from_robots([atlas, bolt]).unwrap()
    }

    #[tokio::test]
    async fn test_empty_database_is_empty_fleet() {
        let repo = test_repo().await;
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let repo = test_repo().await;
        let fleet = sample_fleet();

        repo.save(&fleet).await.unwrap();
        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded, fleet);

        let atlas = loaded.get("atlas").unwrap();
        assert_eq!(atlas.get_attribute("charging"), Some(AttributeValue::Bool(true)));
        assert_eq!(atlas.get_attribute("notes"), Some(AttributeValue::Null));
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let repo = test_repo().await;
        repo.save(&sample_fleet()).await.unwrap();

        let mut fleet = sample_fleet();
        fleet.remove("bolt");
        fleet.get_mut("atlas").unwrap().remove_aspect("battery").unwrap();
        fleet.get_mut("atlas").unwrap().status = "charging".to_string();
        repo.save(&fleet).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        let atlas = loaded.get("atlas").unwrap();
        assert!(!atlas.has_aspect("battery"));
        assert_eq!(atlas.status, "charging");
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let repo = test_repo().await;
        repo.save(&sample_fleet()).await.unwrap();

        let atlas = repo.get("atlas").await.unwrap().unwrap();
        assert_eq!(atlas.hostname.as_deref(), Some("atlas.local"));
        assert_eq!(atlas.get_attribute("battery"), Some("100".into()));
        assert!(repo.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_aspects() {
        let repo = test_repo().await;
        repo.save(&sample_fleet()).await.unwrap();

        repo.delete("atlas").await.unwrap();
        assert!(repo.get("atlas").await.unwrap().is_none());

        let (orphans,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM robot_aspects WHERE robot_name = 'atlas'")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();
        assert_eq!(orphans, 0);

        assert!(matches!(
            repo.delete("atlas").await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_created_at_survives_resave() {
        let repo = test_repo().await;
        repo.save(&sample_fleet()).await.unwrap();
        let (first,): (String,) =
            sqlx::query_as("SELECT created_at FROM robots WHERE name = 'bolt'")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();

        repo.save(&sample_fleet()).await.unwrap();
        let (second,): (String,) =
            sqlx::query_as("SELECT created_at FROM robots WHERE name = 'bolt'")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_modify_only_deletes_robots_it_removed() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = shared_repos(dir.path()).await;
        a.save(&sample_fleet()).await.unwrap();

        let stale = a.load().await.unwrap();
        b.modify(|fleet| fleet.insert(Robot::new("cora", "mk3")?))
            .await
            .unwrap();

        a.modify(|fleet| {
            assert!(fleet.contains("cora"));
            fleet.remove("bolt");
            Ok::<_, RepositoryError>(())
        })
        .await
        .unwrap();

        let loaded = b.load().await.unwrap();
        let names: Vec<&str> = loaded.names().collect();
        assert_eq!(names, vec!["atlas", "cora"]);
        assert_eq!(stale.len(), 2);
    }

    #[tokio::test]
    async fn test_modify_error_rolls_back() {
        let repo = test_repo().await;
        repo.save(&sample_fleet()).await.unwrap();

        let result: Result<(), RepositoryError> = repo
            .modify(|fleet| {
                fleet.remove("atlas");
                Err(RepositoryError::Conflict("rejected".to_string()))
            })
            .await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert!(repo.get("atlas").await.unwrap().is_some());

        // The writer connection is usable again after the rollback.
        repo.modify(|fleet| fleet.insert(Robot::new("cora", "mk3")?))
            .await
            .unwrap();
        assert_eq!(repo.load().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_modify_from_two_pools() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = shared_repos(dir.path()).await;

        let (ra, rb) = tokio::join!(
            a.modify(|fleet| fleet.insert(Robot::new("atlas", "mk2")?)),
            b.modify(|fleet| fleet.insert(Robot::new("bolt", "mk1")?)),
        );
        ra.unwrap();
        rb.unwrap();

        let loaded = a.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[tokio::test]
    async fn test_load_ignores_aspect_rows_without_robot() {
        let repo = test_repo().await;
        repo.save(&sample_fleet()).await.unwrap();

        let mut conn = repo.pool.writer.acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query(
            r#"INSERT INTO robot_aspects (robot_name, name, value) VALUES ('ghost', 'x', '"1"')"#,
        )
        .execute(&mut *conn)
        .await
        .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded, sample_fleet());
    }
}

//! Repository trait definitions (ports).
//!
//! The infrastructure layer (robots-infra) implements these for the flat JSON
//! file and the SQLite database. The core crate never depends on any
//! specific storage technology.

use robots_types::error::RepositoryError;
use robots_types::fleet::Fleet;
use robots_types::robot::Robot;

/// Persistence for the whole fleet.
///
/// `load`/`save` move complete snapshots. `save` must replace the stored fleet
/// with exactly the given robots (robots absent from the snapshot are removed,
/// aspects absent from a robot are removed), so a snapshot loaded earlier can
/// erase robots written since. Read-modify-write goes through [`modify`],
/// which a backend with transactions overrides to hold its write lock from
/// load to save. Uses native async fn in traits (Rust 2024 edition, no
/// async_trait macro).
///
/// [`modify`]: FleetRepository::modify
pub trait FleetRepository: Send + Sync {
    /// Load every robot. A store that does not exist yet is an empty fleet.
    fn load(&self) -> impl std::future::Future<Output = Result<Fleet, RepositoryError>> + Send;

    /// Replace the stored fleet with `fleet`.
    fn save(
        &self,
        fleet: &Fleet,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get one robot by name.
    fn get(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<Robot>, RepositoryError>> + Send;

    /// Permanently delete one robot by name. `NotFound` if absent.
    fn delete(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Load the fleet, apply `f` and persist the result if the fleet changed.
    ///
    /// An error from `f` leaves the store untouched. The default has no
    /// isolation beyond what `load` and `save` give on their own.
    fn modify<T, E, F>(&self, f: F) -> impl std::future::Future<Output = Result<T, E>> + Send
    where
        T: Send,
        E: From<RepositoryError> + Send,
        F: FnOnce(&mut Fleet) -> Result<T, E> + Send,
    {
        async move {
            let mut fleet = self.load().await?;
            let before = fleet.clone();
            let out = f(&mut fleet)?;
            if fleet != before {
                self.save(&fleet).await?;
            }
            Ok(out)
        }
    }
}

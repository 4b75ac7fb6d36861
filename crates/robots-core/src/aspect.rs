//! Fleet-wide aspect registry operations.
//!
//! Adding or removing an aspect is applied to every robot independently.
//! A robot that rejects the change is recorded in the report and the loop
//! moves on; there is no rollback, so a crash mid-loop leaves the aspect on
//! some robots and not others. The report is the source of truth for what
//! needs reconciling.

use robots_types::fleet::Fleet;
use robots_types::robot::AttributeValue;
use serde::Serialize;

/// Why one robot did not take a fleet-wide change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AspectFailure {
    pub robot: String,
    pub reason: String,
}

/// Outcome of a fleet-wide aspect operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AspectReport {
    pub aspect: String,
    /// Robots that changed.
    pub updated: usize,
    pub failures: Vec<AspectFailure>,
}

impl AspectReport {
    fn new(aspect: &str) -> Self {
        Self {
            aspect: aspect.to_string(),
            updated: 0,
            failures: Vec::new(),
        }
    }

    /// The fleet must be persisted iff at least one robot changed.
    pub fn needs_save(&self) -> bool {
        self.updated > 0
    }
}

/// Add `aspect` with `default` to every robot that does not have it yet.
pub fn add_aspect_to_fleet(fleet: &mut Fleet, aspect: &str, default: AttributeValue) -> AspectReport {
    let mut report = AspectReport::new(aspect);

    for robot in fleet.robots_mut() {
        match robot.add_aspect(aspect, default.clone()) {
            Ok(()) => report.updated += 1,
            Err(e) => report.failures.push(AspectFailure {
                robot: robot.name().to_string(),
                reason: failure_reason(e),
            }),
        }
    }

    tracing::debug!(
        aspect,
        updated = report.updated,
        failed = report.failures.len(),
        "add aspect applied"
    );
    report
}

/// Remove `aspect` from every robot that has it.
pub fn remove_aspect_from_fleet(fleet: &mut Fleet, aspect: &str) -> AspectReport {
    let mut report = AspectReport::new(aspect);

    for robot in fleet.robots_mut() {
        match robot.remove_aspect(aspect) {
            Ok(_) => report.updated += 1,
            Err(e) => report.failures.push(AspectFailure {
                robot: robot.name().to_string(),
                reason: failure_reason(e),
            }),
        }
    }

    tracing::debug!(
        aspect,
        updated = report.updated,
        failed = report.failures.len(),
        "remove aspect applied"
    );
    report
}

fn failure_reason(err: robots_types::error::FleetError) -> String {
    match err {
        robots_types::error::FleetError::InvalidAspect(reason) => reason,
        other => other.to_string(),
    }
}

//! Query engine: filter, sort and project a fleet into table rows.
//!
//! Everything here reads robots through `Robot::get_attribute`, so core
//! attributes and aspects are filtered, sorted and displayed the same way.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use robots_types::fleet::Fleet;
use robots_types::robot::{AttributeValue, Robot, coerce_input, parse_bool};
use serde::Serialize;

/// Columns shown for every listing, in order.
pub const SUMMARY_COLUMNS: [&str; 4] = ["name", "model", "hostname", "status"];

/// Appended after the summary columns when any listed robot has a location.
pub const LOCATION_COLUMN: &str = "location";

/// Cell value for an aspect the robot does not carry.
pub const MISSING_CELL: &str = "-";

/// Non-fatal conditions met while answering a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "attribute", rename_all = "snake_case")]
pub enum QueryWarning {
    /// Sorting was skipped because no robot carries the attribute.
    UnknownSortAttribute(String),
}

impl fmt::Display for QueryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryWarning::UnknownSortAttribute(attr) => {
                write!(f, "cannot sort by '{attr}': no robot has that aspect")
            }
        }
    }
}

/// Render-ready listing: header names plus one row per robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotTable {
    pub headers: Vec<String>,
    pub rows: Vec<RobotRow>,
}

/// One table row. `deployed` is carried separately so presenters can style it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotRow {
    pub name: String,
    pub deployed: bool,
    pub cells: Vec<String>,
}

/// Robots matching every predicate (logical AND).
///
/// Predicate values are raw strings and go through [`coerce_input`], so
/// `deployed=TRUE` compares against the boolean. A boolean aspect is matched
/// the same way. A robot without a referenced aspect never matches. No
/// predicates means no filtering.
pub fn filter<'a>(fleet: &'a Fleet, predicates: &BTreeMap<String, String>) -> Vec<&'a Robot> {
    let wanted: Vec<_> = predicates
        .iter()
        .map(|(key, raw)| (key.as_str(), raw.as_str(), coerce_input(key, raw)))
        .collect();

    fleet
        .robots()
        .filter(|robot| {
            wanted.iter().all(|(key, raw, value)| match robot.get_attribute(key) {
                Some(AttributeValue::Bool(stored)) => parse_bool(raw) == Some(stored),
                Some(stored) => stored == *value,
                None => false,
            })
        })
        .collect()
}

/// Stable sort by the string form of `attribute`, missing values as `""`.
///
/// Returns a warning and leaves the order untouched when no robot carries
/// the attribute.
pub fn sort_by(robots: &mut [&Robot], attribute: &str) -> Option<QueryWarning> {
    if !robots.iter().any(|r| r.get_attribute(attribute).is_some()) {
        tracing::warn!(attribute, "sort attribute not found on any robot, order unchanged");
        return Some(QueryWarning::UnknownSortAttribute(attribute.to_string()));
    }

    robots.sort_by_cached_key(|r| {
        r.get_attribute(attribute)
            .map(|v| v.to_string())
            .unwrap_or_default()
    });
    None
}

/// Project robots into table rows.
///
/// Summary mode emits the fixed core columns. Detailed mode also appends the
/// lexicographically sorted union of aspect names across `robots` (not the
/// whole fleet), with [`MISSING_CELL`] where a robot lacks one.
pub fn project(robots: &[&Robot], detailed: bool) -> RobotTable {
    let mut core_columns: Vec<&str> = SUMMARY_COLUMNS.to_vec();
    if robots.iter().any(|r| r.location.is_some()) {
        core_columns.push(LOCATION_COLUMN);
    }

    let aspect_columns: BTreeSet<&str> = if detailed {
        robots
            .iter()
            .flat_map(|r| r.aspects().keys().map(String::as_str))
            .collect()
    } else {
        BTreeSet::new()
    };

    let headers = core_columns
        .iter()
        .chain(aspect_columns.iter())
        .map(|c| c.to_string())
        .collect();

    let rows = robots
        .iter()
        .map(|robot| {
            let cells = core_columns
                .iter()
                .chain(aspect_columns.iter())
                .map(|column| {
                    robot
                        .get_attribute(column)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| MISSING_CELL.to_string())
                })
                .collect();
            RobotRow {
                name: robot.name().to_string(),
                deployed: robot.deployed,
                cells,
            }
        })
        .collect();

    RobotTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot(name: &str, attrs: &[(&str, &str)]) -> Robot {
        let mut r = Robot::new(name, "mk1").unwrap();
        for (k, v) in attrs {
            r.set_attribute(k, coerce_input(k, v)).unwrap();
        }
        r
    }

    fn predicates(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn names(robots: &[&Robot]) -> Vec<String> {
        robots.iter().map(|r| r.name().to_string()).collect()
    }

    #[test]
    fn test_filter_and_semantics() {
        let fleet = Fleet::from_robots([
            robot("a", &[("status", "online"), ("zone", "1")]),
            robot("b", &[("status", "online"), ("zone", "2")]),
        ])
        .unwrap();

        let hits = filter(&fleet, &predicates(&[("status", "online"), ("zone", "1")]));
        assert_eq!(names(&hits), vec!["a"]);
    }

    #[test]
    fn test_filter_empty_predicates_keeps_everyone() {
        let fleet = Fleet::from_robots([robot("a", &[]), robot("b", &[])]).unwrap();
        assert_eq!(filter(&fleet, &BTreeMap::new()).len(), 2);
    }

    #[test]
    fn test_filter_missing_aspect_never_matches() {
        let fleet = Fleet::from_robots([robot("a", &[("zone", "1")]), robot("b", &[])]).unwrap();
        let hits = filter(&fleet, &predicates(&[("zone", "1")]));
        assert_eq!(names(&hits), vec!["a"]);
    }

    #[test]
    fn test_filter_deployed_is_coerced() {
        let fleet =
            Fleet::from_robots([robot("a", &[("deployed", "true")]), robot("b", &[])]).unwrap();

        assert_eq!(names(&filter(&fleet, &predicates(&[("deployed", "True")]))), vec!["a"]);
        assert_eq!(names(&filter(&fleet, &predicates(&[("deployed", "FALSE")]))), vec!["b"]);
        assert!(filter(&fleet, &predicates(&[("deployed", "yes")])).is_empty());
    }

    #[test]
    fn test_filter_matches_boolean_aspect() {
        let mut a = robot("a", &[]);
        a.set_attribute("charging", true.into()).unwrap();
        let mut b = robot("b", &[]);
        b.set_attribute("charging", false.into()).unwrap();
        let c = robot("c", &[("charging", "true")]);
        let fleet = Fleet::from_robots([a, b, c]).unwrap();

        assert_eq!(
            names(&filter(&fleet, &predicates(&[("charging", "TRUE")]))),
            vec!["a"]
        );
        assert_eq!(
            names(&filter(&fleet, &predicates(&[("charging", "false")]))),
            vec!["b"]
        );
        // Text aspects still compare exactly.
        assert_eq!(
            names(&filter(&fleet, &predicates(&[("charging", "true")]))),
            vec!["a", "c"]
        );
    }

    #[test]
    fn test_sort_by_aspect_missing_sorts_first() {
        let fleet = Fleet::from_robots([
            robot("a", &[("rank", "b")]),
            robot("b", &[]),
            robot("c", &[("rank", "a")]),
        ])
        .unwrap();
        let mut robots: Vec<&Robot> = fleet.robots().collect();

        assert!(sort_by(&mut robots, "rank").is_none());
        assert_eq!(names(&robots), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let fleet = Fleet::from_robots([
            robot("a", &[("status", "online")]),
            robot("b", &[("status", "idle")]),
            robot("c", &[("status", "online")]),
        ])
        .unwrap();
        let mut robots: Vec<&Robot> = fleet.robots().collect();

        sort_by(&mut robots, "status");
        assert_eq!(names(&robots), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_by_unknown_attribute_warns_and_keeps_order() {
        let fleet = Fleet::from_robots([robot("b", &[]), robot("a", &[])]).unwrap();
        let mut robots: Vec<&Robot> = fleet.robots().collect();
        let before = names(&robots);

        let warning = sort_by(&mut robots, "firmware");
        assert_eq!(
            warning,
            Some(QueryWarning::UnknownSortAttribute("firmware".to_string()))
        );
        assert_eq!(names(&robots), before);
    }

    #[test]
    fn test_project_summary_columns() {
        let fleet = Fleet::from_robots([robot("a", &[("zone", "1"), ("hostname", "a.local")])])
            .unwrap();
        let robots: Vec<&Robot> = fleet.robots().collect();

        let table = project(&robots, false);
        assert_eq!(table.headers, vec!["name", "model", "hostname", "status"]);
        assert_eq!(table.rows[0].cells, vec!["a", "mk1", "a.local", "idle"]);
    }

    #[test]
    fn test_project_adds_location_when_present() {
        let fleet =
            Fleet::from_robots([robot("a", &[("location", "lab")]), robot("b", &[])]).unwrap();
        let robots: Vec<&Robot> = fleet.robots().collect();

        let table = project(&robots, false);
        assert_eq!(table.headers.last().unwrap(), "location");
        assert_eq!(table.rows[0].cells[4], "lab");
        assert_eq!(table.rows[1].cells[4], "");
    }

    #[test]
    fn test_project_detailed_union_of_aspects() {
        let fleet =
            Fleet::from_robots([robot("a", &[("x", "1")]), robot("b", &[("y", "2")])]).unwrap();
        let robots: Vec<&Robot> = fleet.robots().collect();

        let table = project(&robots, true);
        assert_eq!(
            table.headers,
            vec!["name", "model", "hostname", "status", "x", "y"]
        );
        assert_eq!(&table.rows[0].cells[4..], &["1", "-"]);
        assert_eq!(&table.rows[1].cells[4..], &["-", "2"]);
    }

    #[test]
    fn test_project_detailed_uses_filtered_set_only() {
        let fleet =
            Fleet::from_robots([robot("a", &[("x", "1")]), robot("b", &[("y", "2")])]).unwrap();
        let only_a = filter(&fleet, &predicates(&[("x", "1")]));

        let table = project(&only_a, true);
        assert!(table.headers.contains(&"x".to_string()));
        assert!(!table.headers.contains(&"y".to_string()));
    }

    #[test]
    fn test_project_rows_carry_deployed_flag() {
        let fleet = Fleet::from_robots([robot("a", &[("deployed", "true")])]).unwrap();
        let robots: Vec<&Robot> = fleet.robots().collect();
        assert!(project(&robots, false).rows[0].deployed);
    }
}

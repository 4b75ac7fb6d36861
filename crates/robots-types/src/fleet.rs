use std::collections::BTreeMap;

use crate::error::FleetError;
use crate::robot::Robot;

/// Every robot known to one invocation, keyed (and ordered) by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fleet {
    robots: BTreeMap<String, Robot>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fleet, failing on the first duplicate name.
    pub fn from_robots<I>(robots: I) -> Result<Self, FleetError>
    where
        I: IntoIterator<Item = Robot>,
    {
        let mut fleet = Self::new();
        for robot in robots {
            fleet.insert(robot)?;
        }
        Ok(fleet)
    }

    pub fn len(&self) -> usize {
        self.robots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.robots.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Robot> {
        self.robots.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Robot> {
        self.robots.get_mut(name)
    }

    /// Add a robot. Names are unique across the fleet.
    pub fn insert(&mut self, robot: Robot) -> Result<(), FleetError> {
        if self.robots.contains_key(robot.name()) {
            return Err(FleetError::AlreadyExists(robot.name().to_string()));
        }
        self.robots.insert(robot.name().to_string(), robot);
        Ok(())
    }

    /// Replace an existing robot with an edited copy of itself.
    pub fn update(&mut self, robot: Robot) -> Result<(), FleetError> {
        match self.robots.get_mut(robot.name()) {
            Some(slot) => {
                *slot = robot;
                Ok(())
            }
            None => Err(FleetError::NotFound(robot.name().to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Robot> {
        self.robots.remove(name)
    }

    pub fn robots(&self) -> impl Iterator<Item = &Robot> {
        self.robots.values()
    }

    pub fn robots_mut(&mut self) -> impl Iterator<Item = &mut Robot> {
        self.robots.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.robots.keys().map(String::as_str)
    }
}

impl IntoIterator for Fleet {
    type Item = Robot;
    type IntoIter = std::collections::btree_map::IntoValues<String, Robot>;

    fn into_iter(self) -> Self::IntoIter {
        self.robots.into_values()
    }
}

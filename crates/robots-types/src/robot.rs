use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FleetError;

/// Status assigned to a robot that has never been edited.
pub const DEFAULT_STATUS: &str = "idle";

/// Attributes every robot carries as typed fields, in record order.
///
/// None of these names may ever be used as an aspect.
pub const CORE_ATTRIBUTES: [&str; 6] = ["name", "model", "hostname", "status", "deployed", "location"];

/// Returns true if `key` names one of the fixed robot fields.
pub fn is_core_attribute(key: &str) -> bool {
    CORE_ATTRIBUTES.contains(&key)
}

/// Value of a single robot attribute, core or aspect.
///
/// Serialized untagged: a JSON string, boolean, or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Text(String),
    Null,
}

impl AttributeValue {
    /// Borrow the inner string of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Null => Ok(()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<Option<String>> for AttributeValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(AttributeValue::Null, AttributeValue::Text)
    }
}

/// Parse `"true"` / `"false"` (any case) into a boolean.
pub fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Turn a user-supplied string into the value stored for `key`.
///
/// Every entry point that accepts attribute values as text (CLI filters and
/// edits, HTTP query strings and bodies, flat-file records) goes through here.
/// Only `deployed` is boolean-typed; anything that does not parse as a
/// boolean stays text and is rejected or compared as-is downstream.
pub fn coerce_input(key: &str, raw: &str) -> AttributeValue {
    if key == "deployed" {
        if let Some(b) = parse_bool(raw) {
            return AttributeValue::Bool(b);
        }
    }
    AttributeValue::Text(raw.to_string())
}

/// A robot in the fleet.
///
/// Core attributes are typed fields; everything else lives in the aspect map.
/// `name` is the primary key and cannot change after creation, so it and the
/// aspect map are only reachable through accessors that enforce the
/// core/aspect split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Robot {
    name: String,
    pub model: String,
    pub hostname: Option<String>,
    pub status: String,
    pub deployed: bool,
    pub location: Option<String>,
    aspects: BTreeMap<String, AttributeValue>,
}

impl Robot {
    /// Create an idle, undeployed robot with no aspects.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Result<Self, FleetError> {
        let name = validate_name(name.into())?;
        let model = required_text("model", AttributeValue::Text(model.into()))?;

        Ok(Self {
            name,
            model,
            hostname: None,
            status: DEFAULT_STATUS.to_string(),
            deployed: false,
            location: None,
            aspects: BTreeMap::new(),
        })
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The robot's aspects, ordered by name.
    pub fn aspects(&self) -> &BTreeMap<String, AttributeValue> {
        &self.aspects
    }

    pub fn has_aspect(&self, aspect: &str) -> bool {
        self.aspects.contains_key(aspect)
    }

    /// Read any attribute by name.
    ///
    /// Core attributes always resolve (unset optional fields read as `Null`);
    /// `None` means the robot does not carry that aspect.
    pub fn get_attribute(&self, key: &str) -> Option<AttributeValue> {
        let value = match key {
            "name" => AttributeValue::Text(self.name.clone()),
            "model" => AttributeValue::Text(self.model.clone()),
            "hostname" => self.hostname.clone().into(),
            "status" => AttributeValue::Text(self.status.clone()),
            "deployed" => AttributeValue::Bool(self.deployed),
            "location" => self.location.clone().into(),
            _ => return self.aspects.get(key).cloned(),
        };
        Some(value)
    }

    /// Write any attribute by name, creating the aspect if needed.
    pub fn set_attribute(&mut self, key: &str, value: AttributeValue) -> Result<(), FleetError> {
        match key {
            "name" => {
                return Err(FleetError::InvalidValue {
                    attribute: key.to_string(),
                    reason: "robot names cannot be changed".to_string(),
                });
            }
            "model" => self.model = required_text(key, value)?,
            "status" => self.status = required_text(key, value)?,
            "hostname" => self.hostname = optional_text(key, value)?,
            "location" => self.location = optional_text(key, value)?,
            "deployed" => match value {
                AttributeValue::Bool(b) => self.deployed = b,
                other => {
                    return Err(FleetError::InvalidValue {
                        attribute: key.to_string(),
                        reason: format!("expected true or false, got '{other}'"),
                    });
                }
            },
            _ => {
                validate_aspect_name(key)?;
                self.aspects.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Add a new aspect with a default value.
    pub fn add_aspect(&mut self, aspect: &str, default: AttributeValue) -> Result<(), FleetError> {
        if is_core_attribute(aspect) {
            return Err(FleetError::InvalidAspect(format!(
                "cannot add '{aspect}': it's a core attribute"
            )));
        }
        validate_aspect_name(aspect)?;
        if self.aspects.contains_key(aspect) {
            return Err(FleetError::InvalidAspect(format!(
                "aspect '{aspect}' already exists"
            )));
        }

        self.aspects.insert(aspect.to_string(), default);
        Ok(())
    }

    /// Remove an existing aspect.
    pub fn remove_aspect(&mut self, aspect: &str) -> Result<AttributeValue, FleetError> {
        if is_core_attribute(aspect) {
            return Err(FleetError::InvalidAspect(format!(
                "cannot remove '{aspect}': it's a core attribute"
            )));
        }

        self.aspects.remove(aspect).ok_or_else(|| {
            FleetError::InvalidAspect(format!("aspect '{aspect}' does not exist"))
        })
    }

    /// Flatten core attributes and aspects into one ordered key/value view.
    ///
    /// Core attributes come first in [`CORE_ATTRIBUTES`] order, then aspects
    /// by name. An aspect can never shadow a core attribute because
    /// [`Robot::set_attribute`] and [`Robot::add_aspect`] refuse core names.
    pub fn to_record(&self) -> RobotRecord {
        let mut fields = Vec::with_capacity(CORE_ATTRIBUTES.len() + self.aspects.len());
        for key in CORE_ATTRIBUTES {
            if let Some(value) = self.get_attribute(key) {
                fields.push((key.to_string(), value));
            }
        }
        fields.extend(self.aspects.iter().map(|(k, v)| (k.clone(), v.clone())));
        RobotRecord(fields)
    }

    /// Rebuild a robot from its flat view.
    ///
    /// `name` and `model` are required; every other key goes through
    /// [`Robot::set_attribute`], so text booleans for `deployed` are accepted
    /// and core/aspect rules apply exactly as they do for edits.
    pub fn from_record<I>(fields: I) -> Result<Self, FleetError>
    where
        I: IntoIterator<Item = (String, AttributeValue)>,
    {
        let mut fields: BTreeMap<String, AttributeValue> = fields.into_iter().collect();

        let name = match fields.remove("name") {
            Some(AttributeValue::Text(name)) => name,
            Some(other) => {
                return Err(FleetError::InvalidName(format!(
                    "expected a string name, got '{other}'"
                )));
            }
            None => return Err(FleetError::InvalidName("record has no name".to_string())),
        };
        let model = match fields.remove("model") {
            Some(value) => required_text("model", value)?,
            None => {
                return Err(FleetError::InvalidValue {
                    attribute: "model".to_string(),
                    reason: "record has no model".to_string(),
                });
            }
        };

        let mut robot = Robot::new(name, model)?;
        for (key, value) in fields {
            let value = match value {
                AttributeValue::Text(raw) => coerce_input(&key, &raw),
                other => other,
            };
            robot.set_attribute(&key, value)?;
        }
        Ok(robot)
    }
}

impl Serialize for Robot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Robot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = BTreeMap::<String, AttributeValue>::deserialize(deserializer)?;
        Robot::from_record(fields).map_err(D::Error::custom)
    }
}

/// Ordered flat key/value view of a robot (core attributes first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotRecord(Vec<(String, AttributeValue)>);

impl RobotRecord {
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for RobotRecord {
    type Item = (String, AttributeValue);
    type IntoIter = std::vec::IntoIter<(String, AttributeValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for RobotRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Request to create a new robot. Only `name` and `model` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRobotRequest {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotStatus {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn validate_name(name: String) -> Result<String, FleetError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FleetError::InvalidName("name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_aspect_name(aspect: &str) -> Result<(), FleetError> {
    if aspect.trim().is_empty() {
        return Err(FleetError::InvalidAspect(
            "aspect names cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn required_text(key: &str, value: AttributeValue) -> Result<String, FleetError> {
    match value {
        AttributeValue::Text(s) if !s.trim().is_empty() => Ok(s),
        other => Err(FleetError::InvalidValue {
            attribute: key.to_string(),
            reason: format!("expected a non-empty string, got '{other}'"),
        }),
    }
}

fn optional_text(key: &str, value: AttributeValue) -> Result<Option<String>, FleetError> {
    match value {
        AttributeValue::Text(s) if s.is_empty() => Ok(None),
        AttributeValue::Text(s) => Ok(Some(s)),
        AttributeValue::Null => Ok(None),
        AttributeValue::Bool(b) => Err(FleetError::InvalidValue {
            attribute: key.to_string(),
            reason: format!("expected a string, got '{b}'"),
        }),
    }
}

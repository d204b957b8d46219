use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the attribute that is lifted into [`AttributeSet::units`].
pub const UNITS_ATTRIBUTE: &str = "units";

/// Element type of a variable or coordinate array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ElementType {
    #[default]
    None,
    Byte,
    Char,
    Short,
    Int,
    Int64,
    Float,
    Double,
    String,
}

impl ElementType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ElementType::None => "None",
            ElementType::Byte => "Byte",
            ElementType::Char => "Char",
            ElementType::Short => "Short",
            ElementType::Int => "Int",
            ElementType::Int64 => "Int64",
            ElementType::Float => "Float",
            ElementType::Double => "Double",
            ElementType::String => "String",
        }
    }

    /// Whether coordinate values of this type can be stored in a sub-axis.
    pub const fn is_coordinate_type(self) -> bool {
        matches!(
            self,
            ElementType::Int | ElementType::Float | ElementType::Double
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = match s {
            "None" => ElementType::None,
            "Byte" => ElementType::Byte,
            "Char" => ElementType::Char,
            "Short" => ElementType::Short,
            "Int" => ElementType::Int,
            "Int64" => ElementType::Int64,
            "Float" => ElementType::Float,
            "Double" => ElementType::Double,
            "String" => ElementType::String,
            other => {
                return Err(CatalogError::parse(
                    "datatype",
                    format!("unknown datatype \"{other}\""),
                ))
            }
        };
        Ok(parsed)
    }
}

impl TryFrom<String> for ElementType {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ElementType> for String {
    fn from(value: ElementType) -> Self {
        value.as_str().to_string()
    }
}

/// Named attribute store shared by every catalog entity.
///
/// Attributes are split into "key" attributes, which must agree across every
/// sighting of the same entity, and "other" attributes, which are
/// informational. A given attribute name lives in at most one of the two maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    pub name: String,
    pub element_type: ElementType,
    pub units: String,
    key: BTreeMap<String, String>,
    other: BTreeMap<String, String>,
}

/// Differences found when comparing two sightings of the same entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDiff {
    pub element_type: bool,
    pub units: bool,
    pub key: Vec<String>,
    pub other: Vec<String>,
}

impl AttributeDiff {
    /// True when type, units and key attributes agree.
    pub fn is_consistent(&self) -> bool {
        !self.element_type && !self.units && self.key.is_empty()
    }

    /// Short description of the first blocking difference, used in errors.
    pub fn describe(&self) -> Option<String> {
        if self.element_type {
            Some("type".to_string())
        } else if self.units {
            Some("units".to_string())
        } else {
            self.key
                .first()
                .map(|name| format!("value of key attribute \"{name}\""))
        }
    }
}

impl AttributeSet {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build from raw `(name, value)` pairs as read from a file.
    ///
    /// `units` is lifted into its own field; the rest is classified against
    /// `key_names` (ASCII case-insensitive).
    pub fn from_source(
        name: impl Into<String>,
        element_type: ElementType,
        attributes: &[(String, String)],
        key_names: &[String],
    ) -> Result<Self> {
        let mut set = Self::named(name);
        set.element_type = element_type;
        for (attr_name, value) in attributes {
            set.insert_classified(attr_name, value, key_names)?;
        }
        Ok(set)
    }

    /// Insert one raw attribute, lifting `units` and classifying the rest.
    pub fn insert_classified(&mut self, name: &str, value: &str, key_names: &[String]) -> Result<()> {
        if name == UNITS_ATTRIBUTE {
            self.units = value.to_string();
            return Ok(());
        }
        self.insert(name, value, is_key_name(key_names, name))
    }

    /// Insert an attribute into the key or other map.
    ///
    /// Fails if the name is already present in either map.
    pub fn insert(&mut self, name: &str, value: &str, is_key: bool) -> Result<()> {
        if self.key.contains_key(name) || self.other.contains_key(name) {
            return Err(CatalogError::DuplicateAttribute(name.to_string()));
        }
        let target = if is_key { &mut self.key } else { &mut self.other };
        target.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn key_attributes(&self) -> &BTreeMap<String, String> {
        &self.key
    }

    pub fn other_attributes(&self) -> &BTreeMap<String, String> {
        &self.other
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.key
            .get(name)
            .or_else(|| self.other.get(name))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.other.is_empty()
    }

    /// Key attributes followed by other attributes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.key
            .iter()
            .chain(self.other.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Drop "other" attributes whose value is identical in `master`.
    pub fn remove_redundant_other(&mut self, master: &AttributeSet) {
        self.other
            .retain(|name, value| master.other.get(name) != Some(value));
    }

    /// Compare a later sighting against this (authoritative) one.
    pub fn diff(&self, later: &AttributeSet) -> AttributeDiff {
        AttributeDiff {
            element_type: self.element_type != later.element_type,
            units: self.units != later.units,
            key: map_differences(&self.key, &later.key),
            other: map_differences(&self.other, &later.other),
        }
    }
}

fn is_key_name(key_names: &[String], name: &str) -> bool {
    key_names
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

fn map_differences(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> Vec<String> {
    let mut names: Vec<String> = a
        .iter()
        .filter(|(name, value)| b.get(*name) != Some(*value))
        .map(|(name, _)| name.clone())
        .collect();
    names.extend(
        b.keys()
            .filter(|name| !a.contains_key(*name))
            .cloned(),
    );
    names.sort();
    names
}

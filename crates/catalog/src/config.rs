use crate::axis::AxisKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tolerance used when comparing floating point coordinate values.
pub const DEFAULT_FLOAT_TOLERANCE: f64 = 1e-6;

/// Configuration for catalog construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Relative tolerance for float/double coordinate equality
    pub float_tolerance: f64,

    /// What to do when two files claim the same variable slice
    pub duplicates: DuplicatePolicy,

    /// Attribute names treated as "key" attributes, per entity kind
    pub key_attributes: KeyAttributeNames,

    /// Axis names classified as record (time-like) axes
    pub record_axis_names: Vec<String>,

    /// Axis names classified as vertical axes
    pub vertical_axis_names: Vec<String>,

    /// Axis names classified as horizontal grid axes
    pub grid_axis_names: Vec<String>,
}

/// Handling of a second file mapping an already-indexed variable slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Report the conflict as an ingestion error for the second file.
    #[default]
    Reject,
    /// Keep the first file's mapping and log a warning.
    KeepFirst,
}

/// Kinds of catalog entity that carry attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Collection,
    File,
    Axis,
    Variable,
}

/// Static per-entity sets of attribute names considered "key".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyAttributeNames {
    pub collection: Vec<String>,
    pub file: Vec<String>,
    pub axis: Vec<String>,
    pub variable: Vec<String>,
}

impl Default for KeyAttributeNames {
    fn default() -> Self {
        let global = strings(&["conventions", "version", "history", "tracking_id"]);
        let per_variable = strings(&[
            "missing_value",
            "comments",
            "long_name",
            "grid_name",
            "grid_type",
        ]);
        Self {
            collection: global.clone(),
            file: global,
            axis: per_variable.clone(),
            variable: per_variable,
        }
    }
}

impl KeyAttributeNames {
    pub fn for_kind(&self, kind: EntityKind) -> &[String] {
        match kind {
            EntityKind::Collection => &self.collection,
            EntityKind::File => &self.file,
            EntityKind::Axis => &self.axis,
            EntityKind::Variable => &self.variable,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            float_tolerance: DEFAULT_FLOAT_TOLERANCE,
            duplicates: DuplicatePolicy::Reject,
            key_attributes: KeyAttributeNames::default(),
            record_axis_names: strings(&["time", "t"]),
            vertical_axis_names: strings(&["lev", "ilev", "plev", "pres", "z"]),
            grid_axis_names: strings(&["lat", "lon", "latitude", "longitude", "ncol"]),
        }
    }
}

impl CatalogConfig {
    /// Config requiring bit-identical floating point coordinates
    pub fn exact() -> Self {
        Self {
            float_tolerance: 0.0,
            ..Default::default()
        }
    }

    /// Config where the first file to claim a variable slice silently wins
    pub fn first_writer_wins() -> Self {
        Self {
            duplicates: DuplicatePolicy::KeepFirst,
            ..Default::default()
        }
    }

    /// Load a TOML config file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Classify an axis by name.
    pub fn axis_kind(&self, axis_name: &str) -> AxisKind {
        let matches = |names: &[String]| {
            names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(axis_name))
        };
        if matches(&self.record_axis_names) {
            AxisKind::Record
        } else if matches(&self.vertical_axis_names) {
            AxisKind::Vertical
        } else if matches(&self.grid_axis_names) {
            AxisKind::Grid
        } else {
            AxisKind::Unknown
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

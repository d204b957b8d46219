//! Readers turn one data file into a [`SourceFile`] metadata model.
//!
//! The catalog never touches file formats directly; it consumes whatever a
//! [`DatasetReader`] produces. Bulk variable payloads are never read, only
//! coordinate values of dimensions.

mod header;
#[cfg(feature = "netcdf")]
mod netcdf;

pub use header::JsonHeaderReader;
#[cfg(feature = "netcdf")]
pub use self::netcdf::NetcdfReader;

use crate::attributes::ElementType;
use crate::axis::AxisValues;
use crate::error::{CatalogError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Ordered `(name, value)` attribute pairs as found in a file.
pub type RawAttributes = Vec<(String, String)>;

/// Metadata of one file: global attributes, dimensions and variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    pub attributes: RawAttributes,
    pub dimensions: Vec<SourceDimension>,
    /// Data variables. Coordinate variables live on their dimension.
    pub variables: Vec<SourceVariable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDimension {
    pub name: String,
    pub size: usize,
    pub coordinate: Option<SourceCoordinate>,
}

/// Variable named after a dimension, holding its coordinate values.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCoordinate {
    pub element_type: ElementType,
    pub dimensions: Vec<String>,
    pub attributes: RawAttributes,
    pub values: AxisValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceVariable {
    pub name: String,
    pub element_type: ElementType,
    pub dimensions: Vec<String>,
    pub attributes: RawAttributes,
}

fn raw(attributes: &[(&str, &str)]) -> RawAttributes {
    attributes
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl SourceFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push((name.to_string(), value.to_string()));
        self
    }

    /// Dimension without a coordinate variable.
    pub fn with_dimension(mut self, name: &str, size: usize) -> Self {
        self.dimensions.push(SourceDimension {
            name: name.to_string(),
            size,
            coordinate: None,
        });
        self
    }

    /// Dimension sized by `values`, with a matching one-dimensional coordinate.
    pub fn with_coordinate(mut self, name: &str, values: AxisValues, attributes: &[(&str, &str)]) -> Self {
        self.dimensions.push(SourceDimension {
            name: name.to_string(),
            size: values.len(),
            coordinate: Some(SourceCoordinate {
                element_type: values.element_type(),
                dimensions: vec![name.to_string()],
                attributes: raw(attributes),
                values,
            }),
        });
        self
    }

    pub fn with_variable(
        mut self,
        name: &str,
        element_type: ElementType,
        dimensions: &[&str],
        attributes: &[(&str, &str)],
    ) -> Self {
        self.variables.push(SourceVariable {
            name: name.to_string(),
            element_type,
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            attributes: raw(attributes),
        });
        self
    }

    pub fn dimension(&self, name: &str) -> Option<&SourceDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

/// Opens one data file and enumerates its metadata.
pub trait DatasetReader {
    fn open(&self, path: &Path) -> Result<SourceFile>;
}

impl<R: DatasetReader + ?Sized> DatasetReader for Box<R> {
    fn open(&self, path: &Path) -> Result<SourceFile> {
        (**self).open(path)
    }
}

/// Serves pre-built [`SourceFile`]s keyed by file name.
///
/// Useful for embedding callers that already hold metadata in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<String, SourceFile>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, file: SourceFile) -> Self {
        self.files.insert(name.to_string(), file);
        self
    }

    pub fn insert(&mut self, name: &str, file: SourceFile) {
        self.files.insert(name.to_string(), file);
    }
}

impl DatasetReader for MemoryReader {
    fn open(&self, path: &Path) -> Result<SourceFile> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.files.get(&name).cloned().ok_or_else(|| {
            CatalogError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no such file: {name}"),
            ))
        })
    }
}

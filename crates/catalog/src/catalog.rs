use crate::attributes::{AttributeSet, ElementType};
use crate::axis::{AxisInfo, SubAxis};
use crate::config::{CatalogConfig, DuplicatePolicy, EntityKind};
use crate::error::{CatalogError, Result};
use crate::file::FileInfo;
use crate::reader::{DatasetReader, SourceDimension, SourceFile, SourceVariable};
use crate::registry::Registry;
use crate::scanner::{split_search, FileScanner};
use crate::stats::IngestStats;
use crate::variable::{Placement, VariableInfo};
use std::path::Path;
use std::time::Instant;

/// Cross-file metadata catalog of a collection of data files.
///
/// Files are ingested one at a time. Each file gets the next sequential id
/// ("0", "1", ...), contributes one coordinate variant per dimension, and
/// records which slice of each of its variables it stores.
///
/// Collection attributes are captured from the first file ingested into an
/// empty catalog and are never re-validated against later files.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub(crate) config: CatalogConfig,
    pub(crate) collection: AttributeSet,
    pub(crate) base_dir: String,
    pub(crate) files: Registry<FileInfo>,
    pub(crate) axes: Registry<AxisInfo>,
    pub(crate) variables: Registry<VariableInfo>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

impl Catalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            config,
            collection: AttributeSet::default(),
            base_dir: String::new(),
            files: Registry::new(),
            axes: Registry::new(),
            variables: Registry::new(),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Whether the next ingested file will define the collection attributes.
    pub fn captures_collection_attributes(&self) -> bool {
        self.files.is_empty()
    }

    /// Ingest `file_names` (relative to `base_dir`) in order.
    ///
    /// The first failing file aborts the batch. Everything committed before
    /// the failure, including earlier parts of the failing file, is kept.
    pub fn ingest<R, I, S>(&mut self, reader: &R, base_dir: &Path, file_names: I) -> Result<IngestStats>
    where
        R: DatasetReader + ?Sized,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start = Instant::now();
        let mut stats = IngestStats::new();
        for name in file_names {
            stats.merge(self.ingest_file(reader, base_dir, name.as_ref())?);
        }
        stats.time_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Ingest a single file.
    pub fn ingest_file<R>(&mut self, reader: &R, base_dir: &Path, name: &str) -> Result<IngestStats>
    where
        R: DatasetReader + ?Sized,
    {
        let path = base_dir.join(name);
        let filename = path.to_string_lossy().into_owned();
        let source = reader.open(&path).map_err(|e| match e {
            open @ CatalogError::Open { .. } => open,
            other => CatalogError::Open {
                path: filename.clone(),
                reason: other.to_string(),
            },
        })?;

        log::info!("Indexing {filename}");
        if self.base_dir.is_empty() {
            self.base_dir = base_dir.to_string_lossy().into_owned();
        }
        self.ingest_source(&filename, &source)
    }

    /// Ingest metadata already read by the caller.
    pub fn ingest_source(&mut self, filename: &str, source: &SourceFile) -> Result<IngestStats> {
        let Catalog {
            config,
            collection,
            files,
            axes,
            variables,
            ..
        } = self;
        let mut stats = IngestStats::new();

        if files.is_empty() {
            *collection = AttributeSet::from_source(
                "",
                ElementType::None,
                &source.attributes,
                config.key_attributes.for_kind(EntityKind::Collection),
            )?;
            log::debug!("Captured {} collection attributes", collection.iter().count());
        }

        let mut attributes = AttributeSet::from_source(
            "",
            ElementType::None,
            &source.attributes,
            config.key_attributes.for_kind(EntityKind::File),
        )?;
        attributes.units.clear();
        attributes.remove_redundant_other(collection);

        let file_id = files.next_id();
        let file = match files.insert(file_id.clone(), FileInfo::new(filename, attributes)) {
            Ok(file) => file,
            Err(_) => panic!("file id {file_id} handed out twice"),
        };
        stats.add_file();

        log::debug!("Loading {} dimensions", source.dimensions.len());
        for dim in &source.dimensions {
            let (variant_id, created_axis, created_variant) =
                ingest_axis(config, axes, dim, filename)?;
            stats.add_axis(created_axis, created_variant);
            file.set_axis_variant(dim.name.clone(), variant_id);
        }

        log::debug!("Loading {} variables", source.variables.len());
        for var in &source.variables {
            if axes.contains_key(&var.name) {
                continue;
            }
            ingest_variable(config, variables, source, file, &file_id, var, &mut stats)?;
        }

        Ok(stats)
    }

    /// Ingest every file matching `pattern` below `directory`.
    ///
    /// Each directory is ingested as its own batch with that directory as
    /// base, root directory first.
    pub fn populate_from_path<R>(
        &mut self,
        reader: &R,
        directory: &Path,
        pattern: &str,
        recurse: bool,
    ) -> Result<IngestStats>
    where
        R: DatasetReader + ?Sized,
    {
        let start = Instant::now();
        let batches = FileScanner::new(directory)
            .with_pattern(pattern)
            .recursive(recurse)
            .scan()?;
        let mut stats = IngestStats::new();
        for batch in batches {
            stats.merge(self.ingest(reader, &batch.directory, &batch.files)?);
        }
        stats.time_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Ingest files matching a search string such as `data/run1/*.nc`.
    pub fn populate_from_search<R>(&mut self, reader: &R, search: &str) -> Result<IngestStats>
    where
        R: DatasetReader + ?Sized,
    {
        let (directory, pattern) = split_search(search)?;
        self.populate_from_path(reader, &directory, &pattern, false)
    }

    pub fn lookup(&self, variable: &str) -> Option<&VariableInfo> {
        self.variables.get(variable)
    }

    pub fn axis(&self, name: &str) -> Option<&AxisInfo> {
        self.axes.get(name)
    }

    pub fn file(&self, id: &str) -> Option<&FileInfo> {
        self.files.get(id)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileInfo)> {
        self.files.iter()
    }

    pub fn axes(&self) -> impl Iterator<Item = (&str, &AxisInfo)> {
        self.axes.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &VariableInfo)> {
        self.variables.iter()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn collection_attributes(&self) -> &AttributeSet {
        &self.collection
    }

    /// Base directory of the first ingested batch; empty for loaded catalogs.
    pub fn base_directory(&self) -> &str {
        &self.base_dir
    }
}

/// Validate a dimension and build its candidate variant.
fn candidate_variant(dim: &SourceDimension) -> Result<SubAxis> {
    let Some(coordinate) = &dim.coordinate else {
        return Ok(SubAxis::untyped(dim.size));
    };
    let malformed = |reason: String| CatalogError::MalformedAxis {
        axis: dim.name.clone(),
        reason,
    };

    if coordinate.dimensions.len() != 1 {
        return Err(malformed(format!(
            "must have exactly 1 dimension, found {}",
            coordinate.dimensions.len()
        )));
    }
    if coordinate.dimensions[0] != dim.name {
        return Err(malformed(format!(
            "does not have dimension \"{}\"",
            dim.name
        )));
    }
    if !coordinate.element_type.is_coordinate_type() {
        return Err(CatalogError::UnsupportedAxisType {
            axis: dim.name.clone(),
            datatype: coordinate.element_type.to_string(),
        });
    }
    if coordinate.values.element_type() != coordinate.element_type {
        return Err(malformed(format!(
            "values are {} but datatype is {}",
            coordinate.values.element_type(),
            coordinate.element_type
        )));
    }
    if coordinate.values.len() != dim.size {
        return Err(malformed(format!(
            "holds {} values for a dimension of size {}",
            coordinate.values.len(),
            dim.size
        )));
    }
    Ok(SubAxis::new(dim.size, coordinate.values.clone()))
}

/// Record one dimension sighting; returns (variant id, new axis, new variant).
fn ingest_axis(
    config: &CatalogConfig,
    axes: &mut Registry<AxisInfo>,
    dim: &SourceDimension,
    filename: &str,
) -> Result<(String, bool, bool)> {
    let candidate = candidate_variant(dim)?;
    let sighting = match &dim.coordinate {
        Some(coordinate) => Some(AttributeSet::from_source(
            dim.name.clone(),
            coordinate.element_type,
            &coordinate.attributes,
            config.key_attributes.for_kind(EntityKind::Axis),
        )?),
        None => None,
    };

    let (axis, created) = axes.get_or_insert_with(&dim.name, || {
        AxisInfo::new(dim.name.clone(), config.axis_kind(&dim.name))
    });

    if created {
        if let Some(sighting) = sighting {
            axis.attributes = sighting;
        }
    } else {
        match sighting {
            None if axis.element_type() != ElementType::None => {
                return Err(CatalogError::MissingCoordinate {
                    axis: dim.name.clone(),
                    file: filename.to_string(),
                });
            }
            None => {}
            Some(sighting) => {
                if axis.element_type() != sighting.element_type {
                    return Err(CatalogError::AxisTypeMismatch {
                        axis: dim.name.clone(),
                        expected: axis.element_type().to_string(),
                        found: sighting.element_type.to_string(),
                    });
                }
                let diff = axis.attributes.diff(&sighting);
                if let Some(what) = diff.describe() {
                    return Err(CatalogError::AxisMismatch {
                        axis: dim.name.clone(),
                        what,
                    });
                }
                if !diff.other.is_empty() {
                    log::warn!(
                        "Axis \"{}\" in \"{}\" differs in attributes {:?}; keeping first values",
                        dim.name,
                        filename,
                        diff.other
                    );
                }
            }
        }
    }

    let (variant_id, created_variant) = axis.intern(candidate, config.float_tolerance);
    if created_variant {
        log::debug!("Axis \"{}\": new variant {variant_id} (size {})", dim.name, dim.size);
    } else {
        log::debug!("Axis \"{}\": reusing variant {variant_id}", dim.name);
    }
    Ok((variant_id, created, created_variant))
}

/// Record one variable sighting into its location index.
fn ingest_variable(
    config: &CatalogConfig,
    variables: &mut Registry<VariableInfo>,
    source: &SourceFile,
    file: &FileInfo,
    file_id: &str,
    var: &SourceVariable,
    stats: &mut IngestStats,
) -> Result<()> {
    if let Some(missing) = var
        .dimensions
        .iter()
        .find(|dim| source.dimension(dim).is_none())
    {
        return Err(CatalogError::MalformedVariable {
            variable: var.name.clone(),
            reason: format!(
                "dimension \"{missing}\" is not defined in \"{}\"",
                file.filename()
            ),
        });
    }

    let sighting = AttributeSet::from_source(
        var.name.clone(),
        var.element_type,
        &var.attributes,
        config.key_attributes.for_kind(EntityKind::Variable),
    )?;

    let axis_names = var.dimensions.clone();
    let variant_ids: Vec<String> = axis_names
        .iter()
        .map(|axis| match file.axis_variant(axis) {
            Some(id) => id.to_string(),
            None => panic!(
                "no variant recorded for axis \"{axis}\" of variable \"{}\" in file {file_id}",
                var.name
            ),
        })
        .collect();

    if let Some(existing) = variables.get(&var.name) {
        let diff = existing.attributes.diff(&sighting);
        if let Some(what) = diff.describe() {
            return Err(CatalogError::VariableMismatch {
                variable: var.name.clone(),
                what,
            });
        }
        if !diff.other.is_empty() {
            log::warn!(
                "Variable \"{}\" in \"{}\" differs in attributes {:?}; keeping first values",
                var.name,
                file.filename(),
                diff.other
            );
        }
        if let Some(owner) = existing.locate(&axis_names, &variant_ids) {
            if owner != file_id && config.duplicates == DuplicatePolicy::Reject {
                return Err(CatalogError::DuplicateLocation {
                    variable: var.name.clone(),
                    slice: describe_slice(&axis_names, &variant_ids),
                    existing: owner.to_string(),
                    file: file.filename().to_string(),
                });
            }
        }
    }

    let (entry, created) =
        variables.get_or_insert_with(&var.name, || VariableInfo::new(sighting));
    stats.add_variable(created);

    match entry.record_location(axis_names, variant_ids, file_id) {
        Placement::Inserted => stats.add_location(),
        Placement::Unchanged => {}
        Placement::Conflict { existing } => log::warn!(
            "Variable \"{}\" slice already stored by file {existing}; ignoring \"{}\"",
            var.name,
            file.filename()
        ),
    }
    Ok(())
}

fn describe_slice(axis_names: &[String], variant_ids: &[String]) -> String {
    let pairs: Vec<String> = axis_names
        .iter()
        .zip(variant_ids)
        .map(|(axis, id)| format!("{axis}={id}"))
        .collect();
    format!("({})", pairs.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisValues;
    use crate::reader::MemoryReader;
    use pretty_assertions::assert_eq;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn lat_file(values: Vec<f64>, temp_type: ElementType) -> SourceFile {
        SourceFile::new()
            .with_attribute("Conventions", "CF-1.6")
            .with_attribute("institution", "NCAR")
            .with_coordinate("lat", AxisValues::Double(values), &[("units", "degrees_north")])
            .with_variable("temp", temp_type, &["lat"], &[("units", "K")])
    }

    #[test]
    fn assigns_sequential_file_ids_and_shares_variants() {
        let reader = MemoryReader::new()
            .with_file("a.nc", lat_file(vec![-45.0, 0.0, 45.0], ElementType::Float))
            .with_file("b.nc", lat_file(vec![-30.0, 0.0, 30.0], ElementType::Float))
            .with_file("c.nc", lat_file(vec![-45.0, 0.0, 45.0], ElementType::Float));
        let mut catalog = Catalog::new(CatalogConfig::first_writer_wins());

        let stats = catalog
            .ingest(&reader, Path::new("data"), ["a.nc", "b.nc", "c.nc"])
            .unwrap();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.axes, 1);
        assert_eq!(stats.variants, 2);
        assert_eq!(catalog.files().map(|(id, _)| id).collect::<Vec<_>>(), vec!["0", "1", "2"]);
        assert_eq!(catalog.file("2").unwrap().axis_variant("lat"), Some("0"));
        assert_eq!(catalog.file("1").unwrap().filename(), "data/b.nc");
        assert_eq!(catalog.base_directory(), "data");

        let temp = catalog.lookup("temp").unwrap();
        assert_eq!(temp.locate(&ids(&["lat"]), &ids(&["0"])), Some("0"));
        assert_eq!(temp.locate(&ids(&["lat"]), &ids(&["1"])), Some("1"));
        assert_eq!(temp.attributes.units, "K");
        assert!(catalog.lookup("lat").is_none());
    }

    #[test]
    fn first_file_defines_collection_attributes() {
        let second = lat_file(vec![1.0, 2.0, 3.0], ElementType::Float)
            .with_attribute("history", "regridded");
        let reader = MemoryReader::new()
            .with_file("a.nc", lat_file(vec![-45.0, 0.0, 45.0], ElementType::Float))
            .with_file("b.nc", second);
        let mut catalog = Catalog::default();
        assert!(catalog.captures_collection_attributes());

        catalog.ingest(&reader, Path::new(""), ["a.nc", "b.nc"]).unwrap();

        assert!(!catalog.captures_collection_attributes());
        let collection = catalog.collection_attributes();
        assert_eq!(collection.key_attributes().get("Conventions").unwrap(), "CF-1.6");
        assert_eq!(collection.get("history"), None);

        // identical "other" attributes are pruned from files, key ones stay
        let file = catalog.file("1").unwrap();
        assert_eq!(file.attributes.get("institution"), None);
        assert_eq!(file.attributes.get("Conventions"), Some("CF-1.6"));
        assert_eq!(file.attributes.get("history"), Some("regridded"));
    }

    #[test]
    fn variable_type_mismatch_leaves_entry_untouched() {
        let reader = MemoryReader::new()
            .with_file("a.nc", lat_file(vec![-45.0, 0.0, 45.0], ElementType::Float))
            .with_file("b.nc", lat_file(vec![-30.0, 0.0, 30.0], ElementType::Double));
        let mut catalog = Catalog::default();
        catalog.ingest(&reader, Path::new(""), ["a.nc"]).unwrap();
        let before = catalog.lookup("temp").unwrap().clone();

        let err = catalog.ingest(&reader, Path::new(""), ["b.nc"]).unwrap_err();

        assert!(matches!(err, CatalogError::VariableMismatch { ref variable, .. } if variable == "temp"));
        assert_eq!(catalog.lookup("temp").unwrap(), &before);
        // the failing file itself stays registered, no rollback
        assert_eq!(catalog.file_count(), 2);
    }

    #[test]
    fn axis_type_mismatch_is_reported() {
        let ints = SourceFile::new()
            .with_coordinate("time", AxisValues::Int(vec![0, 1]), &[])
            .with_variable("ps", ElementType::Float, &["time"], &[]);
        let doubles = SourceFile::new()
            .with_coordinate("time", AxisValues::Double(vec![0.0, 1.0]), &[])
            .with_variable("ps", ElementType::Float, &["time"], &[]);
        let reader = MemoryReader::new()
            .with_file("a.nc", ints)
            .with_file("b.nc", doubles);
        let mut catalog = Catalog::default();

        let err = catalog
            .ingest(&reader, Path::new(""), ["a.nc", "b.nc"])
            .unwrap_err();
        assert!(err.to_string().contains("possible duplicate axis name"));
        assert_eq!(catalog.axis("time").unwrap().variants().len(), 1);
    }

    #[test]
    fn missing_coordinate_for_typed_axis_is_reported() {
        let with = SourceFile::new().with_coordinate("lev", AxisValues::Float(vec![1.0]), &[]);
        let without = SourceFile::new().with_dimension("lev", 1);
        let reader = MemoryReader::new()
            .with_file("a.nc", with)
            .with_file("b.nc", without);
        let mut catalog = Catalog::default();

        let err = catalog
            .ingest(&reader, Path::new(""), ["a.nc", "b.nc"])
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingCoordinate { ref axis, ref file } if axis == "lev" && file == "b.nc"));
    }

    #[test]
    fn key_attribute_changes_on_axes_are_errors_other_changes_are_not() {
        let make = |long_name: &str, comment: &str| {
            SourceFile::new().with_coordinate(
                "lat",
                AxisValues::Double(vec![0.0]),
                &[("long_name", long_name), ("comment", comment)],
            )
        };
        let reader = MemoryReader::new()
            .with_file("a.nc", make("latitude", "x"))
            .with_file("b.nc", make("latitude", "y"))
            .with_file("c.nc", make("lat", "x"));
        let mut catalog = Catalog::default();

        catalog.ingest(&reader, Path::new(""), ["a.nc", "b.nc"]).unwrap();
        let err = catalog.ingest(&reader, Path::new(""), ["c.nc"]).unwrap_err();
        assert!(matches!(err, CatalogError::AxisMismatch { ref axis, .. } if axis == "lat"));
    }

    #[test]
    fn malformed_axes_and_variables_are_rejected() {
        let two_d = SourceFile {
            dimensions: vec![SourceDimension {
                name: "lat".to_string(),
                size: 2,
                coordinate: Some(crate::reader::SourceCoordinate {
                    element_type: ElementType::Double,
                    dimensions: ids(&["lat", "lon"]),
                    attributes: Vec::new(),
                    values: AxisValues::Double(vec![0.0, 1.0]),
                }),
            }],
            ..SourceFile::default()
        };
        let mut chars = SourceFile::new().with_coordinate("lat", AxisValues::Empty, &[]);
        if let Some(c) = chars.dimensions[0].coordinate.as_mut() {
            c.element_type = ElementType::Char;
        }
        let dangling = SourceFile::new()
            .with_dimension("x", 2)
            .with_variable("v", ElementType::Float, &["x", "y"], &[]);
        let reader = MemoryReader::new()
            .with_file("a.nc", two_d)
            .with_file("b.nc", chars)
            .with_file("c.nc", dangling);

        let mut catalog = Catalog::default();
        assert!(matches!(
            catalog.ingest(&reader, Path::new(""), ["a.nc"]).unwrap_err(),
            CatalogError::MalformedAxis { .. }
        ));
        assert!(matches!(
            catalog.ingest(&reader, Path::new(""), ["b.nc"]).unwrap_err(),
            CatalogError::UnsupportedAxisType { .. }
        ));
        assert!(matches!(
            catalog.ingest(&reader, Path::new(""), ["c.nc"]).unwrap_err(),
            CatalogError::MalformedVariable { ref variable, .. } if variable == "v"
        ));
        assert!(catalog.lookup("v").is_none());
    }

    #[test]
    fn unreadable_file_stops_the_batch() {
        let reader = MemoryReader::new()
            .with_file("a.nc", lat_file(vec![0.0, 1.0, 2.0], ElementType::Float));
        let mut catalog = Catalog::default();

        let err = catalog
            .ingest(&reader, Path::new("dir"), ["a.nc", "gone.nc", "a.nc"])
            .unwrap_err();
        assert!(matches!(err, CatalogError::Open { ref path, .. } if path == "dir/gone.nc"));
        assert_eq!(catalog.file_count(), 1);
    }
}

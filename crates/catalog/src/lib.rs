//! # Autocurator Catalog
//!
//! Cross-file metadata catalog for collections of gridded array files.
//!
//! ## Pipeline
//!
//! ```text
//! Directory / search string
//!     │
//!     ├──> File Scanner (glob, optional recursion)
//!     │      └─> File names per directory
//!     │
//!     ├──> Dataset Reader (JSON header, NetCDF)
//!     │      └─> Attributes, dimensions, coordinates, variables
//!     │
//!     ├──> Catalog (dedup coordinate variants, consistency checks)
//!     │      └─> variable -> axis group -> variant ids -> file id
//!     │
//!     └──> Output (JSON, CDML XML) on the primary process only
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use autocurator_catalog::{json, Catalog, CatalogConfig, JsonHeaderReader};
//! use std::path::Path;
//!
//! fn main() -> autocurator_catalog::Result<()> {
//!     let mut catalog = Catalog::new(CatalogConfig::default());
//!     let stats = catalog.populate_from_search(&JsonHeaderReader::new(), "data/*.json")?;
//!     println!("Indexed {} files, {} variables", stats.files, stats.variables);
//!
//!     json::write_json_file(&catalog, Path::new("catalog.json"), true)?;
//!     Ok(())
//! }
//! ```

mod attributes;
mod axis;
mod catalog;
mod config;
mod error;
mod file;
pub mod json;
mod output;
pub mod reader;
mod registry;
mod scanner;
mod stats;
mod variable;
pub mod xml;

pub use attributes::{AttributeDiff, AttributeSet, ElementType, UNITS_ATTRIBUTE};
pub use axis::{almost_equal, AxisInfo, AxisKind, AxisValues, SubAxis};
pub use catalog::Catalog;
pub use config::{
    CatalogConfig, DuplicatePolicy, EntityKind, KeyAttributeNames, DEFAULT_FLOAT_TOLERANCE,
};
pub use error::{CatalogError, Result};
pub use file::FileInfo;
pub use output::{is_primary_process, rank_from_env, write_atomic, WriteOutcome, RANK_VARIABLES};
pub use reader::{DatasetReader, JsonHeaderReader, MemoryReader, SourceFile};
#[cfg(feature = "netcdf")]
pub use reader::NetcdfReader;
pub use registry::Registry;
pub use scanner::{split_search, FileScanner, ScanBatch, DEFAULT_PATTERN};
pub use stats::IngestStats;
pub use variable::{AxisNames, LocationIndex, Placement, SliceToFile, VariableInfo, VariantIds};

use serde::{Deserialize, Serialize};

/// Statistics about an ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Number of files ingested
    pub files: usize,

    /// Axes seen for the first time
    pub axes: usize,

    /// Coordinate variants retained (not deduplicated away)
    pub variants: usize,

    /// Variables seen for the first time
    pub variables: usize,

    /// New slice → file entries in location indexes
    pub locations: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Files skipped after an ingestion error
    pub errors: Vec<String>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            files: 0,
            axes: 0,
            variants: 0,
            variables: 0,
            locations: 0,
            time_ms: 0,
            errors: Vec::new(),
        }
    }

    pub fn add_file(&mut self) {
        self.files += 1;
    }

    pub fn add_axis(&mut self, created_axis: bool, created_variant: bool) {
        self.axes += usize::from(created_axis);
        self.variants += usize::from(created_variant);
    }

    pub fn add_variable(&mut self, created: bool) {
        self.variables += usize::from(created);
    }

    pub fn add_location(&mut self) {
        self.locations += 1;
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn merge(&mut self, other: IngestStats) {
        self.files += other.files;
        self.axes += other.axes;
        self.variants += other.variants;
        self.variables += other.variables;
        self.locations += other.locations;
        self.time_ms += other.time_ms;
        self.errors.extend(other.errors);
    }
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

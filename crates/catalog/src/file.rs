use crate::attributes::AttributeSet;
use std::collections::BTreeMap;

/// Metadata for one ingested file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileInfo {
    /// File-level attributes; `name`, `units` and `element_type` are unused.
    pub attributes: AttributeSet,
    filename: String,
    axis_variants: BTreeMap<String, String>,
}

impl FileInfo {
    pub fn new(filename: impl Into<String>, attributes: AttributeSet) -> Self {
        Self {
            attributes,
            filename: filename.into(),
            axis_variants: BTreeMap::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Variant id this file contributed for `axis`.
    pub fn axis_variant(&self, axis: &str) -> Option<&str> {
        self.axis_variants.get(axis).map(String::as_str)
    }

    pub fn axis_variants(&self) -> &BTreeMap<String, String> {
        &self.axis_variants
    }

    pub(crate) fn set_axis_variant(&mut self, axis: impl Into<String>, variant_id: impl Into<String>) {
        self.axis_variants.insert(axis.into(), variant_id.into());
    }
}

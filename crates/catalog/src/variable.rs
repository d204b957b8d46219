use crate::attributes::AttributeSet;
use std::collections::BTreeMap;

/// Ordered list of axis names a variable uses in one file.
pub type AxisNames = Vec<String>;
/// One variant id per axis, same order as the [`AxisNames`] key.
pub type VariantIds = Vec<String>;
/// Variant tuple to the id of the file storing that slice.
pub type SliceToFile = BTreeMap<VariantIds, String>;
/// Axis group to its slice map.
pub type LocationIndex = BTreeMap<AxisNames, SliceToFile>;

/// Outcome of recording one slice location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Inserted,
    /// Same slice already mapped to the same file.
    Unchanged,
    /// Slice already owned by another file; the index was left untouched.
    Conflict { existing: String },
}

/// One named variable across the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub attributes: AttributeSet,
    location_index: LocationIndex,
}

impl VariableInfo {
    pub fn new(attributes: AttributeSet) -> Self {
        Self {
            attributes,
            location_index: LocationIndex::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn location_index(&self) -> &LocationIndex {
        &self.location_index
    }

    /// Axis groups in their canonical (sorted) order.
    pub fn axis_groups(&self) -> impl Iterator<Item = &AxisNames> {
        self.location_index.keys()
    }

    /// File id storing the slice `variant_ids` of axis group `axis_names`.
    pub fn locate(&self, axis_names: &[String], variant_ids: &[String]) -> Option<&str> {
        self.location_index
            .get(axis_names)
            .and_then(|slices| slices.get(variant_ids))
            .map(String::as_str)
    }

    /// Number of recorded slices across all groups.
    pub fn slice_count(&self) -> usize {
        self.location_index.values().map(BTreeMap::len).sum()
    }

    /// Record that `file_id` stores the given slice. Never overwrites.
    pub fn record_location(
        &mut self,
        axis_names: AxisNames,
        variant_ids: VariantIds,
        file_id: &str,
    ) -> Placement {
        let slices = self.location_index.entry(axis_names).or_default();
        match slices.get(&variant_ids) {
            Some(existing) if existing == file_id => Placement::Unchanged,
            Some(existing) => Placement::Conflict {
                existing: existing.clone(),
            },
            None => {
                slices.insert(variant_ids, file_id.to_string());
                Placement::Inserted
            }
        }
    }

    /// Ensure a (possibly empty) group exists; used when loading a catalog.
    pub(crate) fn insert_group(&mut self, axis_names: AxisNames) -> &mut SliceToFile {
        self.location_index.entry(axis_names).or_default()
    }
}

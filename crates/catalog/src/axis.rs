use crate::attributes::{AttributeSet, ElementType};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Role an axis plays in the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    #[default]
    Unknown,
    Auxiliary,
    Grid,
    Record,
    Vertical,
}

/// Typed coordinate values of one axis occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AxisValues {
    /// No coordinate variable: the axis is known only by its size.
    #[default]
    Empty,
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl AxisValues {
    pub fn element_type(&self) -> ElementType {
        match self {
            AxisValues::Empty => ElementType::None,
            AxisValues::Int(_) => ElementType::Int,
            AxisValues::Float(_) => ElementType::Float,
            AxisValues::Double(_) => ElementType::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AxisValues::Empty => 0,
            AxisValues::Int(v) => v.len(),
            AxisValues::Float(v) => v.len(),
            AxisValues::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element-wise equality; floating types compare within `tolerance`.
    pub fn matches(&self, other: &AxisValues, tolerance: f64) -> bool {
        match (self, other) {
            (AxisValues::Empty, AxisValues::Empty) => true,
            (AxisValues::Int(a), AxisValues::Int(b)) => a == b,
            (AxisValues::Float(a), AxisValues::Float(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| almost_equal(f64::from(*x), f64::from(*y), tolerance))
            }
            (AxisValues::Double(a), AxisValues::Double(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|(x, y)| almost_equal(*x, *y, tolerance))
            }
            _ => false,
        }
    }

    /// Values as `f64`, for orientation checks and text rendering.
    pub fn as_f64s(&self) -> Vec<f64> {
        match self {
            AxisValues::Empty => Vec::new(),
            AxisValues::Int(v) => v.iter().map(|x| f64::from(*x)).collect(),
            AxisValues::Float(v) => v.iter().map(|x| f64::from(*x)).collect(),
            AxisValues::Double(v) => v.clone(),
        }
    }

    /// Space separated list in brackets, e.g. `[1 2.5 4]`.
    pub fn to_text(&self) -> String {
        let items: Vec<String> = match self {
            AxisValues::Empty => return "[ ]".to_string(),
            AxisValues::Int(v) => v.iter().map(ToString::to_string).collect(),
            AxisValues::Float(v) => v.iter().map(ToString::to_string).collect(),
            AxisValues::Double(v) => v.iter().map(ToString::to_string).collect(),
        };
        format!("[{}]", items.join(" "))
    }
}

/// Tolerant comparison: absolute near zero, relative for large magnitudes.
pub fn almost_equal(a: f64, b: f64, tolerance: f64) -> bool {
    if a == b || (a.is_nan() && b.is_nan()) {
        return true;
    }
    let scale = 1.0_f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= tolerance * scale
}

/// One concrete occurrence of an axis' coordinates ("variant").
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubAxis {
    pub attributes: AttributeSet,
    pub size: usize,
    pub values: AxisValues,
}

impl SubAxis {
    pub fn new(size: usize, values: AxisValues) -> Self {
        let mut attributes = AttributeSet::default();
        attributes.element_type = values.element_type();
        Self {
            attributes,
            size,
            values,
        }
    }

    /// Axis with no coordinate variable.
    pub fn untyped(size: usize) -> Self {
        Self::new(size, AxisValues::Empty)
    }

    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }

    /// Value identity used for deduplication.
    pub fn matches(&self, other: &SubAxis, tolerance: f64) -> bool {
        self.size == other.size && self.values.matches(&other.values, tolerance)
    }
}

/// One named axis across the whole collection.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInfo {
    pub attributes: AttributeSet,
    pub kind: AxisKind,
    variants: Registry<SubAxis>,
}

impl AxisInfo {
    pub fn new(name: impl Into<String>, kind: AxisKind) -> Self {
        Self {
            attributes: AttributeSet::named(name),
            kind,
            variants: Registry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.attributes.name
    }

    pub fn element_type(&self) -> ElementType {
        self.attributes.element_type
    }

    pub fn variants(&self) -> &Registry<SubAxis> {
        &self.variants
    }

    pub fn variant(&self, id: &str) -> Option<&SubAxis> {
        self.variants.get(id)
    }

    /// Id of the first variant (in creation order) equal to `candidate`.
    pub fn find_variant(&self, candidate: &SubAxis, tolerance: f64) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, existing)| existing.matches(candidate, tolerance))
            .map(|(id, _)| id)
    }

    /// Deduplicate `candidate` against the known variants.
    ///
    /// Returns the variant id and whether a new variant was retained.
    pub fn intern(&mut self, candidate: SubAxis, tolerance: f64) -> (String, bool) {
        if let Some(id) = self.find_variant(&candidate, tolerance) {
            return (id.to_string(), false);
        }
        let id = self.variants.next_id();
        if self.variants.insert(id.clone(), candidate).is_err() {
            panic!("variant id {id} handed out twice");
        }
        (id, true)
    }

    /// Insert a variant under an explicit id (catalog loading).
    pub(crate) fn insert_variant(&mut self, id: &str, variant: SubAxis) -> bool {
        self.variants.insert(id, variant).is_ok()
    }

    /// Common size of all variants, `None` if they disagree or there are none.
    pub fn size(&self) -> Option<usize> {
        let mut sizes = self.variants.values().map(|v| v.size);
        let first = sizes.next()?;
        sizes.all(|s| s == first).then_some(first)
    }

    /// +1 for increasing coordinates, -1 for decreasing, 0 if unknown.
    ///
    /// Derived from the first variant holding at least two values.
    pub fn orientation(&self) -> i32 {
        self.variants
            .values()
            .map(|v| v.values.as_f64s())
            .find(|values| values.len() >= 2)
            .map(|values| {
                if values[1] > values[0] {
                    1
                } else if values[1] < values[0] {
                    -1
                } else {
                    0
                }
            })
            .unwrap_or(0)
    }
}

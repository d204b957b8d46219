use super::{
    DatasetReader, RawAttributes, SourceCoordinate, SourceDimension, SourceFile, SourceVariable,
};
use crate::attributes::ElementType;
use crate::axis::AxisValues;
use crate::error::{CatalogError, Result};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;

/// Reads JSON header files describing a data file's metadata.
///
/// ```json
/// {
///   "attributes": { "Conventions": "CF-1.6" },
///   "dimensions": { "lat": 3, "time": 1 },
///   "variables": {
///     "lat":  { "datatype": "Double", "dimensions": ["lat"],
///               "attributes": { "units": "degrees_north" },
///               "values": [-45.0, 0.0, 45.0] },
///     "temp": { "datatype": "Float", "dimensions": ["time", "lat"],
///               "attributes": { "units": "K" } }
///   }
/// }
/// ```
///
/// A variable named after a dimension is that dimension's coordinate
/// variable; `null` in `values` stands for NaN. Attributes, dimensions and
/// variables are reported in the order the header lists them.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHeaderReader;

impl JsonHeaderReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse header text into a [`SourceFile`].
    pub fn parse(text: &str) -> Result<SourceFile> {
        let header: Header = serde_json::from_str(text)?;
        header.into_source()
    }
}

impl DatasetReader for JsonHeaderReader {
    fn open(&self, path: &Path) -> Result<SourceFile> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

type Entries<T> = Vec<(String, T)>;

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default, deserialize_with = "in_document_order")]
    attributes: Entries<Value>,
    #[serde(default, deserialize_with = "in_document_order")]
    dimensions: Entries<Value>,
    #[serde(default, deserialize_with = "in_document_order")]
    variables: Entries<HeaderVariable>,
}

#[derive(Debug, Deserialize)]
struct HeaderVariable {
    datatype: ElementType,
    #[serde(default)]
    dimensions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "in_document_order")]
    attributes: Entries<Value>,
    #[serde(default)]
    values: Option<Vec<Option<f64>>>,
}

/// A JSON object as key/value pairs, keeping the order of the text.
fn in_document_order<'de, D, T>(deserializer: D) -> std::result::Result<Entries<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for EntriesVisitor<T>
    where
        T: Deserialize<'de>,
    {
        type Value = Entries<T>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a JSON object")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

impl Header {
    fn into_source(self) -> Result<SourceFile> {
        let mut order = Vec::with_capacity(self.variables.len());
        let mut variables: HashMap<String, HeaderVariable> = HashMap::new();
        for (name, variable) in self.variables {
            if variables.insert(name.clone(), variable).is_some() {
                return Err(CatalogError::parse(&name, "variable listed twice"));
            }
            order.push(name);
        }

        let mut dimensions: Vec<SourceDimension> = Vec::with_capacity(self.dimensions.len());
        for (name, size) in self.dimensions {
            if dimensions.iter().any(|d| d.name == name) {
                return Err(CatalogError::parse(&name, "dimension listed twice"));
            }
            let size = size
                .as_u64()
                .and_then(|size| usize::try_from(size).ok())
                .ok_or_else(|| CatalogError::parse(&name, "dimension size must be a non-negative integer"))?;
            let coordinate = match variables.remove(&name) {
                Some(variable) => Some(variable.into_coordinate(&name)?),
                None => None,
            };
            dimensions.push(SourceDimension {
                name,
                size,
                coordinate,
            });
        }

        let mut source_variables = Vec::with_capacity(variables.len());
        for name in order {
            let Some(variable) = variables.remove(&name) else {
                continue;
            };
            source_variables.push(SourceVariable {
                element_type: variable.datatype,
                dimensions: variable.dimensions.unwrap_or_default(),
                attributes: attribute_pairs(&name, variable.attributes)?,
                name,
            });
        }

        Ok(SourceFile {
            attributes: attribute_pairs("attributes", self.attributes)?,
            dimensions,
            variables: source_variables,
        })
    }
}

impl HeaderVariable {
    fn into_coordinate(self, name: &str) -> Result<SourceCoordinate> {
        let raw_values = self.values.unwrap_or_default();
        let values = typed_values(name, self.datatype, &raw_values)?;
        Ok(SourceCoordinate {
            element_type: self.datatype,
            dimensions: self.dimensions.unwrap_or_else(|| vec![name.to_string()]),
            attributes: attribute_pairs(name, self.attributes)?,
            values,
        })
    }
}

/// Convert header numbers according to the declared datatype.
///
/// Types that cannot back a sub-axis yield [`AxisValues::Empty`]; the
/// catalog reports them when the dimension is ingested.
fn typed_values(name: &str, datatype: ElementType, raw: &[Option<f64>]) -> Result<AxisValues> {
    let as_f64 = |v: &Option<f64>| v.unwrap_or(f64::NAN);
    let values = match datatype {
        ElementType::Int => {
            let mut ints = Vec::with_capacity(raw.len());
            for value in raw {
                let v = as_f64(value);
                if v.fract() != 0.0 || v < f64::from(i32::MIN) || v > f64::from(i32::MAX) {
                    return Err(CatalogError::MalformedAxis {
                        axis: name.to_string(),
                        reason: format!("value {v} is not a 32-bit integer"),
                    });
                }
                ints.push(v as i32);
            }
            AxisValues::Int(ints)
        }
        ElementType::Float => AxisValues::Float(raw.iter().map(|v| as_f64(v) as f32).collect()),
        ElementType::Double => AxisValues::Double(raw.iter().map(as_f64).collect()),
        _ => AxisValues::Empty,
    };
    Ok(values)
}

/// Flatten a JSON attribute object into string pairs.
fn attribute_pairs(entity: &str, attributes: Entries<Value>) -> Result<RawAttributes> {
    attributes
        .into_iter()
        .map(|(name, value)| {
            let text = attribute_text(&value).ok_or_else(|| {
                CatalogError::parse(entity, format!("attribute \"{name}\" has an unsupported value"))
            })?;
            Ok((name, text))
        })
        .collect()
}

/// String form of a scalar (or list of scalars) attribute value.
fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) => None,
                    other => attribute_text(other),
                })
                .collect();
            parts.map(|p| p.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = r#"{
        "attributes": { "Conventions": "CF-1.6", "version": 2 },
        "dimensions": { "time": 2, "lat": 3, "nbnd": 2 },
        "variables": {
            "temp": { "datatype": "Float", "dimensions": ["time", "lat"],
                      "attributes": { "units": "K", "long_name": "temperature" } },
            "lat":  { "datatype": "Double", "attributes": { "units": "degrees_north" },
                      "values": [-45.0, 0.0, null] },
            "time": { "datatype": "Int", "dimensions": ["time"], "values": [0, 6] }
        }
    }"#;

    #[test]
    fn attaches_coordinates_to_dimensions() {
        let source = JsonHeaderReader::parse(HEADER).unwrap();

        assert_eq!(
            source.attributes,
            vec![
                ("Conventions".to_string(), "CF-1.6".to_string()),
                ("version".to_string(), "2".to_string()),
            ]
        );
        let lat = source.dimension("lat").unwrap();
        let coordinate = lat.coordinate.as_ref().unwrap();
        assert_eq!(coordinate.dimensions, vec!["lat".to_string()]);
        match &coordinate.values {
            AxisValues::Double(v) => {
                assert_eq!(&v[..2], &[-45.0, 0.0]);
                assert!(v[2].is_nan());
            }
            other => panic!("unexpected values {other:?}"),
        }
        assert_eq!(
            source.dimension("time").unwrap().coordinate.as_ref().unwrap().values,
            AxisValues::Int(vec![0, 6])
        );
        assert!(source.dimension("nbnd").unwrap().coordinate.is_none());

        assert_eq!(source.variables.len(), 1);
        assert_eq!(source.variables[0].name, "temp");
        assert_eq!(source.variables[0].element_type, ElementType::Float);
    }

    #[test]
    fn rejects_fractional_int_coordinates() {
        let err = JsonHeaderReader::parse(
            r#"{ "dimensions": {"t": 1}, "variables": {"t": {"datatype": "Int", "values": [0.5]}} }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::MalformedAxis { axis, .. } if axis == "t"));
    }

    #[test]
    fn rejects_unknown_datatypes() {
        assert!(JsonHeaderReader::parse(
            r#"{ "variables": {"x": {"datatype": "Complex"}} }"#
        )
        .is_err());
    }

    #[test]
    fn reads_header_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.nc");
        std::fs::write(&path, HEADER).unwrap();
        let source = JsonHeaderReader::new().open(&path).unwrap();
        assert_eq!(source.dimensions.len(), 3);
    }

    #[test]
    fn keeps_header_order() {
        let source = JsonHeaderReader::parse(
            r#"{
                "attributes": { "title": "run", "Conventions": "CF-1.6" },
                "dimensions": { "time": 1, "lat": 2, "bnds": 2 },
                "variables": {
                    "ps": { "datatype": "Float", "dimensions": ["time", "lat"],
                            "attributes": { "units": "Pa", "cell_methods": "time: mean" } },
                    "area": { "datatype": "Double", "dimensions": ["lat"] }
                }
            }"#,
        )
        .unwrap();

        let dimensions: Vec<&str> = source.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(dimensions, vec!["time", "lat", "bnds"]);
        let variables: Vec<&str> = source.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(variables, vec!["ps", "area"]);
        assert_eq!(source.attributes[0].0, "title");
        assert_eq!(source.variables[0].attributes[0].0, "units");
    }

    #[test]
    fn rejects_repeated_dimensions() {
        let err = JsonHeaderReader::parse(r#"{ "dimensions": { "lat": 2, "lat": 3 } }"#).unwrap_err();
        assert!(err.to_string().contains("listed twice"), "{err}");
    }
}

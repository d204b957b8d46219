//! Canonical JSON projection of a [`Catalog`] and the matching loader.
//!
//! ```text
//! {
//!   "dataset":   { <collection attributes> },
//!   "file":      { "0": { "name": "...", <attributes>, "axes": [["lat", "0"], ...] } },
//!   "axes":      { "lat": { "datatype": "Double", "units": "...", "size": 3, "values": [...] },
//!                  "time": { "datatype": "Int", "units": "...",
//!                            "subaxes": { "0": { "datatype": "Int", "size": 2, "values": [...] } } } },
//!   "variables": { "T": { "datatype": "Float", "units": "K", <attributes>,
//!                         "axisids": ["time", "lat"], "subaxismap": [["0", "0", "0"], ...] } }
//! }
//! ```
//!
//! Variables with several axis groups nest `axisids`/`subaxismap` under
//! `axisgroups.<index>`. NaN coordinate values are written as `null`,
//! infinities as `"inf"` / `"-inf"`. All four top-level sections are required.

use crate::attributes::{AttributeSet, ElementType};
use crate::axis::{AxisInfo, AxisValues, SubAxis};
use crate::catalog::Catalog;
use crate::config::{CatalogConfig, EntityKind};
use crate::error::{CatalogError, Result};
use crate::file::FileInfo;
use crate::output::{write_primary, WriteOutcome};
use crate::variable::{SliceToFile, VariableInfo};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::path::Path;

const FILE_FIELDS: &[&str] = &["name", "axes"];
const AXIS_FIELDS: &[&str] = &["datatype", "size", "values", "subaxes"];
const VARIABLE_FIELDS: &[&str] = &["datatype", "axisids", "subaxismap", "axisgroups"];
const POS_INFINITY: &str = "inf";
const NEG_INFINITY: &str = "-inf";

/// Build the JSON document tree.
pub fn to_value(catalog: &Catalog) -> Value {
    let mut root = Map::new();
    root.insert(
        "dataset".to_string(),
        Value::Object(attribute_map(&catalog.collection, true)),
    );

    let mut files = Map::new();
    for (id, file) in catalog.files.iter() {
        files.insert(id.to_string(), file_value(file));
    }
    root.insert("file".to_string(), Value::Object(files));

    let mut axes = Map::new();
    for (name, axis) in catalog.axes.iter() {
        axes.insert(name.to_string(), axis_value(axis));
    }
    root.insert("axes".to_string(), Value::Object(axes));

    let mut variables = Map::new();
    for (name, variable) in catalog.variables.iter() {
        variables.insert(name.to_string(), variable_value(variable));
    }
    root.insert("variables".to_string(), Value::Object(variables));

    Value::Object(root)
}

/// Serialize to text; `pretty` indents with four spaces.
pub fn to_json(catalog: &Catalog, pretty: bool) -> Result<String> {
    let value = to_value(catalog);
    if !pretty {
        return Ok(serde_json::to_string(&value)?);
    }
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| CatalogError::parse("document", e.to_string()))
}

pub fn write_json_file(catalog: &Catalog, path: &Path, pretty: bool) -> Result<WriteOutcome> {
    write_primary(path, || to_json(catalog, pretty))
}

pub fn read_json_file(path: &Path, config: CatalogConfig) -> Result<Catalog> {
    let text = std::fs::read_to_string(path)?;
    from_json(&text, config)
}

fn attribute_map(set: &AttributeSet, with_units: bool) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, value) in set.iter() {
        map.insert(name.to_string(), Value::String(value.to_string()));
    }
    if with_units && !set.units.is_empty() {
        map.insert("units".to_string(), Value::String(set.units.clone()));
    }
    map
}

fn file_value(file: &FileInfo) -> Value {
    let mut entry = attribute_map(&file.attributes, false);
    entry.insert("name".to_string(), Value::String(file.filename().to_string()));
    let axes = file
        .axis_variants()
        .iter()
        .map(|(axis, variant)| {
            Value::Array(vec![
                Value::String(axis.clone()),
                Value::String(variant.clone()),
            ])
        })
        .collect();
    entry.insert("axes".to_string(), Value::Array(axes));
    Value::Object(entry)
}

fn axis_value(axis: &AxisInfo) -> Value {
    let mut entry = attribute_map(&axis.attributes, false);
    entry.insert("units".to_string(), Value::String(axis.attributes.units.clone()));
    entry.insert(
        "datatype".to_string(),
        Value::String(axis.element_type().to_string()),
    );

    let variants = axis.variants();
    if variants.len() == 1 {
        if let Some(variant) = variants.values().next() {
            write_sub_axis(&mut entry, variant);
        }
    } else {
        let mut subaxes = Map::new();
        for (id, variant) in variants.iter() {
            let mut sub = Map::new();
            write_sub_axis(&mut sub, variant);
            subaxes.insert(id.to_string(), Value::Object(sub));
        }
        entry.insert("subaxes".to_string(), Value::Object(subaxes));
    }
    Value::Object(entry)
}

fn write_sub_axis(entry: &mut Map<String, Value>, variant: &SubAxis) {
    entry.insert(
        "datatype".to_string(),
        Value::String(variant.element_type().to_string()),
    );
    entry.insert("size".to_string(), Value::from(variant.size));
    if variant.element_type() != ElementType::None {
        entry.insert("values".to_string(), values_value(&variant.values));
    }
}

fn values_value(values: &AxisValues) -> Value {
    let items = match values {
        AxisValues::Empty => Vec::new(),
        AxisValues::Int(v) => v.iter().map(|x| Value::from(*x)).collect(),
        // shortest decimal form, so 0.1f32 is written as 0.1
        AxisValues::Float(v) => v
            .iter()
            .map(|x| float_value(x.to_string().parse().unwrap_or(f64::from(*x))))
            .collect(),
        AxisValues::Double(v) => v.iter().map(|x| float_value(*x)).collect(),
    };
    Value::Array(items)
}

/// NaN is written as `null`, infinities as the strings `"inf"` and `"-inf"`.
fn float_value(x: f64) -> Value {
    match serde_json::Number::from_f64(x) {
        Some(n) => Value::Number(n),
        None if x == f64::INFINITY => Value::String(POS_INFINITY.to_string()),
        None if x == f64::NEG_INFINITY => Value::String(NEG_INFINITY.to_string()),
        None => Value::Null,
    }
}

fn variable_value(variable: &VariableInfo) -> Value {
    let mut entry = attribute_map(&variable.attributes, false);
    entry.insert(
        "units".to_string(),
        Value::String(variable.attributes.units.clone()),
    );
    entry.insert(
        "datatype".to_string(),
        Value::String(variable.attributes.element_type.to_string()),
    );

    let groups = variable.location_index();
    if groups.len() == 1 {
        for (axis_names, slices) in groups {
            write_group(&mut entry, axis_names, slices);
        }
    } else if groups.len() > 1 {
        let mut nested = Map::new();
        for (ix, (axis_names, slices)) in groups.iter().enumerate() {
            let mut group = Map::new();
            write_group(&mut group, axis_names, slices);
            nested.insert(ix.to_string(), Value::Object(group));
        }
        entry.insert("axisgroups".to_string(), Value::Object(nested));
    }
    Value::Object(entry)
}

fn write_group(entry: &mut Map<String, Value>, axis_names: &[String], slices: &SliceToFile) {
    entry.insert(
        "axisids".to_string(),
        Value::Array(axis_names.iter().cloned().map(Value::String).collect()),
    );
    let rows = slices
        .iter()
        .map(|(variant_ids, file_id)| {
            let mut row: Vec<Value> = variant_ids.iter().cloned().map(Value::String).collect();
            row.push(Value::String(file_id.clone()));
            Value::Array(row)
        })
        .collect();
    entry.insert("subaxismap".to_string(), Value::Array(rows));
}

/// Rebuild a catalog from its JSON text.
///
/// Every file, variant and slice reference is checked against the loaded
/// entries; a loaded catalog can keep ingesting new files.
pub fn from_json(text: &str, config: CatalogConfig) -> Result<Catalog> {
    let root: Value = serde_json::from_str(text)?;
    let root = as_object(&root, "document")?;
    let mut catalog = Catalog::new(config);

    catalog.collection = attributes_from(
        "dataset",
        section(root, "dataset")?,
        &[],
        catalog.config.key_attributes.for_kind(EntityKind::Collection),
    )?;

    let files = section(root, "file")?;
    for id in numeric_order(files) {
        let file = file_from(id, &files[id], &catalog.config)?;
        if catalog.files.insert(id.clone(), file).is_err() {
            return Err(CatalogError::parse(id, "duplicate file id"));
        }
    }

    for (name, value) in section(root, "axes")? {
        let axis = axis_from(name, value, &catalog.config)?;
        if catalog.axes.insert(name.clone(), axis).is_err() {
            return Err(CatalogError::parse(name, "duplicate axis"));
        }
    }

    for (name, value) in section(root, "variables")? {
        let variable = variable_from(name, value, &catalog)?;
        if catalog.variables.insert(name.clone(), variable).is_err() {
            return Err(CatalogError::parse(name, "duplicate variable"));
        }
    }

    for (id, file) in catalog.files.iter() {
        for (axis, variant) in file.axis_variants() {
            check_variant(&catalog, id, axis, variant)?;
        }
    }

    log::debug!(
        "Loaded catalog with {} files, {} axes, {} variables",
        catalog.files.len(),
        catalog.axes.len(),
        catalog.variables.len()
    );
    Ok(catalog)
}

fn as_object<'a>(value: &'a Value, entity: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CatalogError::parse(entity, "must be an object"))
}

/// A required top-level object.
fn section<'a>(root: &'a Map<String, Value>, key: &str) -> Result<&'a Map<String, Value>> {
    let value = root
        .get(key)
        .ok_or_else(|| CatalogError::parse("document", format!("missing \"{key}\" key")))?;
    as_object(value, key)
}

fn as_str<'a>(value: &'a Value, entity: &str, key: &str) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| CatalogError::parse(entity, format!("\"{key}\" must be a string")))
}

/// String form of an attribute value; strings and numbers only.
pub(crate) fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn attributes_from(
    entity: &str,
    object: &Map<String, Value>,
    reserved: &[&str],
    key_names: &[String],
) -> Result<AttributeSet> {
    let mut set = AttributeSet::default();
    for (name, value) in object {
        if reserved.contains(&name.as_str()) {
            continue;
        }
        let text = attribute_text(value).ok_or_else(|| {
            CatalogError::parse(entity, format!("attribute \"{name}\" must be a string or number"))
        })?;
        set.insert_classified(name, &text, key_names)
            .map_err(|e| CatalogError::parse(entity, e.to_string()))?;
    }
    Ok(set)
}

/// Keys with decimal ids in numeric order, anything else after them.
fn numeric_order(object: &Map<String, Value>) -> Vec<&String> {
    let mut keys: Vec<&String> = object.keys().collect();
    keys.sort_by_key(|key| (key.parse::<u64>().unwrap_or(u64::MAX), (*key).clone()));
    keys
}

fn datatype_of(object: &Map<String, Value>, entity: &str) -> Result<Option<ElementType>> {
    object
        .get("datatype")
        .map(|value| as_str(value, entity, "datatype")?.parse())
        .transpose()
}

fn file_from(id: &str, value: &Value, config: &CatalogConfig) -> Result<FileInfo> {
    let entity = format!("file \"{id}\"");
    let object = as_object(value, &entity)?;
    let name = object
        .get("name")
        .ok_or_else(|| CatalogError::parse(&entity, "missing \"name\" key"))?;
    let name = as_str(name, &entity, "name")?;

    let attributes = attributes_from(
        &entity,
        object,
        FILE_FIELDS,
        config.key_attributes.for_kind(EntityKind::File),
    )?;
    let mut file = FileInfo::new(name, attributes);

    if let Some(axes) = object.get("axes") {
        let pairs = axes
            .as_array()
            .ok_or_else(|| CatalogError::parse(&entity, "\"axes\" must be an array"))?;
        for pair in pairs {
            match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(axis), Value::String(variant)]) => {
                    file.set_axis_variant(axis.clone(), variant.clone())
                }
                _ => {
                    return Err(CatalogError::parse(
                        &entity,
                        "\"axes\" entries must be [axis, subaxis] string pairs",
                    ))
                }
            }
        }
    }
    Ok(file)
}

fn axis_from(name: &str, value: &Value, config: &CatalogConfig) -> Result<AxisInfo> {
    let entity = format!("axis \"{name}\"");
    let object = as_object(value, &entity)?;
    let datatype = datatype_of(object, &entity)?
        .ok_or_else(|| CatalogError::parse(&entity, "missing \"datatype\" key"))?;

    let mut axis = AxisInfo::new(name, config.axis_kind(name));
    axis.attributes = attributes_from(
        &entity,
        object,
        AXIS_FIELDS,
        config.key_attributes.for_kind(EntityKind::Axis),
    )?;
    axis.attributes.name = name.to_string();
    axis.attributes.element_type = datatype;

    let inline = object.contains_key("size") || object.contains_key("values");
    match object.get("subaxes") {
        Some(_) if inline => {
            return Err(CatalogError::parse(
                &entity,
                "both \"values\"/\"size\" and \"subaxes\" given",
            ))
        }
        Some(subaxes) => {
            let subaxes = as_object(subaxes, &entity)?;
            for id in numeric_order(subaxes) {
                let sub_entity = format!("{entity} subaxis \"{id}\"");
                let sub = sub_axis_from(&sub_entity, as_object(&subaxes[id], &sub_entity)?, datatype)?;
                axis.insert_variant(id, sub);
            }
        }
        None => {
            let sub = sub_axis_from(&entity, object, datatype)?;
            axis.insert_variant("0", sub);
        }
    }
    Ok(axis)
}

fn sub_axis_from(
    entity: &str,
    object: &Map<String, Value>,
    axis_type: ElementType,
) -> Result<SubAxis> {
    let datatype = datatype_of(object, entity)?.unwrap_or(axis_type);
    if datatype != axis_type {
        return Err(CatalogError::parse(
            entity,
            format!("datatype {datatype} differs from axis datatype {axis_type}"),
        ));
    }
    let size = object
        .get("size")
        .ok_or_else(|| CatalogError::parse(entity, "missing \"size\" key"))?
        .as_u64()
        .and_then(|size| usize::try_from(size).ok())
        .ok_or_else(|| CatalogError::parse(entity, "\"size\" must be a non-negative integer"))?;

    let items: &[Value] = match object.get("values") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => return Err(CatalogError::parse(entity, "\"values\" must be an array")),
    };
    let bad_value = |v: &Value| CatalogError::parse(entity, format!("invalid {datatype} value {v}"));

    let values = match datatype {
        ElementType::None if items.is_empty() => AxisValues::Empty,
        ElementType::None => {
            return Err(CatalogError::parse(entity, "untyped subaxis cannot carry values"))
        }
        ElementType::Int => AxisValues::Int(
            items
                .iter()
                .map(|v| {
                    v.as_i64()
                        .and_then(|x| i32::try_from(x).ok())
                        .ok_or_else(|| bad_value(v))
                })
                .collect::<Result<_>>()?,
        ),
        ElementType::Float => AxisValues::Float(
            items
                .iter()
                .map(|v| float_of(v).map(|x| x as f32).ok_or_else(|| bad_value(v)))
                .collect::<Result<_>>()?,
        ),
        ElementType::Double => AxisValues::Double(
            items
                .iter()
                .map(|v| float_of(v).ok_or_else(|| bad_value(v)))
                .collect::<Result<_>>()?,
        ),
        other => {
            return Err(CatalogError::parse(
                entity,
                format!("unsupported subaxis datatype {other}"),
            ))
        }
    };

    if datatype != ElementType::None && values.len() != size {
        return Err(CatalogError::parse(
            entity,
            format!("{} values for size {size}", values.len()),
        ));
    }
    Ok(SubAxis::new(size, values))
}

fn float_of(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(f64::NAN),
        Value::String(s) if s == POS_INFINITY => Some(f64::INFINITY),
        Value::String(s) if s == NEG_INFINITY => Some(f64::NEG_INFINITY),
        other => other.as_f64(),
    }
}

fn variable_from(name: &str, value: &Value, catalog: &Catalog) -> Result<VariableInfo> {
    let entity = format!("variable \"{name}\"");
    let object = as_object(value, &entity)?;
    let datatype = datatype_of(object, &entity)?
        .ok_or_else(|| CatalogError::parse(&entity, "missing \"datatype\" key"))?;

    let mut attributes = attributes_from(
        &entity,
        object,
        VARIABLE_FIELDS,
        catalog.config.key_attributes.for_kind(EntityKind::Variable),
    )?;
    attributes.name = name.to_string();
    attributes.element_type = datatype;
    let mut variable = VariableInfo::new(attributes);

    let inline = object.contains_key("axisids") || object.contains_key("subaxismap");
    match object.get("axisgroups") {
        Some(_) if inline => {
            return Err(CatalogError::parse(
                &entity,
                "both \"axisgroups\" and \"axisids\"/\"subaxismap\" given",
            ))
        }
        Some(groups) => {
            let groups = as_object(groups, &entity)?;
            for ix in numeric_order(groups) {
                let group_entity = format!("{entity} axisgroup \"{ix}\"");
                group_from(
                    &group_entity,
                    as_object(&groups[ix], &group_entity)?,
                    &mut variable,
                    catalog,
                )?;
            }
        }
        None if inline => group_from(&entity, object, &mut variable, catalog)?,
        None => {
            return Err(CatalogError::parse(
                &entity,
                "missing \"axisids\"/\"subaxismap\" or \"axisgroups\" key",
            ))
        }
    }
    Ok(variable)
}

fn group_from(
    entity: &str,
    object: &Map<String, Value>,
    variable: &mut VariableInfo,
    catalog: &Catalog,
) -> Result<()> {
    let axis_names: Vec<String> = match object.get("axisids") {
        None => return Err(CatalogError::parse(entity, "missing \"axisids\" key")),
        Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| as_str(item, entity, "axisids").map(str::to_string))
            .collect::<Result<_>>()?,
        Some(_) => return Err(CatalogError::parse(entity, "\"axisids\" must be an array")),
    };
    let rows = object
        .get("subaxismap")
        .ok_or_else(|| CatalogError::parse(entity, "missing \"subaxismap\" key"))?
        .as_array()
        .ok_or_else(|| {
            CatalogError::parse(entity, "\"subaxismap\" must be an array of arrays of strings")
        })?;

    let slices = variable.insert_group(axis_names.clone());
    for row in rows {
        let row: Vec<&str> = row
            .as_array()
            .ok_or_else(|| CatalogError::parse(entity, "\"subaxismap\" rows must be arrays"))?
            .iter()
            .map(|item| as_str(item, entity, "subaxismap"))
            .collect::<Result<_>>()?;
        let Some((file_id, variant_ids)) = row.split_last() else {
            return Err(CatalogError::parse(entity, "empty \"subaxismap\" row"));
        };
        if variant_ids.len() != axis_names.len() {
            return Err(CatalogError::parse(
                entity,
                format!(
                    "\"subaxismap\" row has {} entries, expected {}",
                    row.len(),
                    axis_names.len() + 1
                ),
            ));
        }
        if catalog.files.get(file_id).is_none() {
            return Err(CatalogError::parse(entity, format!("unknown file id \"{file_id}\"")));
        }
        for (axis, variant) in axis_names.iter().zip(variant_ids) {
            check_variant(catalog, entity, axis, variant)?;
        }
        let key: Vec<String> = variant_ids.iter().map(|id| id.to_string()).collect();
        if slices.insert(key, file_id.to_string()).is_some() {
            return Err(CatalogError::parse(entity, "duplicate \"subaxismap\" row"));
        }
    }
    Ok(())
}

fn check_variant(catalog: &Catalog, entity: &str, axis: &str, variant: &str) -> Result<()> {
    match catalog.axes.get(axis) {
        Some(info) if info.variant(variant).is_some() => Ok(()),
        Some(_) => Err(CatalogError::parse(
            entity,
            format!("unknown subaxis \"{variant}\" of axis \"{axis}\""),
        )),
        None => Err(CatalogError::parse(entity, format!("unknown axis \"{axis}\""))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{MemoryReader, SourceFile};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample(times: &[Vec<i32>]) -> Catalog {
        let mut reader = MemoryReader::new();
        let mut names = Vec::new();
        for (ix, time) in times.iter().enumerate() {
            let name = format!("f{ix}.nc");
            reader.insert(
                &name,
                SourceFile::new()
                    .with_attribute("Conventions", "CF-1.6")
                    .with_attribute("source", "model")
                    .with_coordinate("time", AxisValues::Int(time.clone()), &[("units", "days")])
                    .with_coordinate(
                        "lat",
                        AxisValues::Float(vec![0.1, f32::NAN]),
                        &[("units", "degrees_north"), ("long_name", "latitude")],
                    )
                    .with_dimension("nbnd", 2)
                    .with_variable("T", ElementType::Float, &["time", "lat"], &[("units", "K")])
                    .with_variable("area", ElementType::Double, &["lat"], &[]),
            );
            names.push(name);
        }
        let mut catalog = Catalog::new(CatalogConfig::first_writer_wins());
        catalog.ingest(&reader, Path::new("run"), &names).unwrap();
        catalog
    }

    #[test]
    fn single_variant_axes_are_inlined() {
        let value = to_value(&sample(&[vec![0, 1]]));
        let time = &value["axes"]["time"];

        assert_eq!(time["values"], json!([0, 1]));
        assert_eq!(time["size"], json!(2));
        assert_eq!(time["datatype"], json!("Int"));
        assert_eq!(time["units"], json!("days"));
        assert!(time.get("subaxes").is_none());
        assert_eq!(value["axes"]["lat"]["values"], json!([0.1, null]));
        assert!(value["axes"]["nbnd"].get("values").is_none());
    }

    #[test]
    fn multiple_variants_use_subaxes() {
        let value = to_value(&sample(&[vec![0, 1], vec![2, 3]]));
        let time = &value["axes"]["time"];

        assert!(time.get("values").is_none());
        assert_eq!(time["subaxes"]["0"]["values"], json!([0, 1]));
        assert_eq!(time["subaxes"]["1"]["values"], json!([2, 3]));
        assert_eq!(value["variables"]["T"]["axisids"], json!(["time", "lat"]));
        assert_eq!(
            value["variables"]["T"]["subaxismap"],
            json!([["0", "0", "0"], ["1", "0", "1"]])
        );
        assert_eq!(value["file"]["1"]["name"], json!("run/f1.nc"));
        assert_eq!(
            value["file"]["1"]["axes"],
            json!([["lat", "0"], ["nbnd", "0"], ["time", "1"]])
        );
        assert_eq!(value["dataset"]["Conventions"], json!("CF-1.6"));
    }

    #[test]
    fn pretty_output_uses_four_space_indent() {
        let text = to_json(&sample(&[vec![0]]), true).unwrap();
        assert!(text.starts_with("{\n    \"axes\": {"));
        assert!(!to_json(&sample(&[vec![0]]), false).unwrap().contains('\n'));
    }

    #[test]
    fn round_trip_preserves_variants_and_locations() {
        let catalog = sample(&[vec![0, 1], vec![2, 3], vec![0, 1]]);
        let text = to_json(&catalog, true).unwrap();
        let loaded = from_json(&text, CatalogConfig::default()).unwrap();

        assert_eq!(loaded.collection_attributes(), catalog.collection_attributes());
        for (name, axis) in catalog.axes() {
            let other = loaded.axis(name).unwrap();
            assert_eq!(other.element_type(), axis.element_type());
            assert_eq!(other.attributes, axis.attributes);
            assert_eq!(other.variants().keys().collect::<Vec<_>>(), axis.variants().keys().collect::<Vec<_>>());
            for (id, variant) in axis.variants().iter() {
                assert!(other.variant(id).unwrap().matches(variant, 0.0), "{name}/{id}");
            }
        }
        for (name, variable) in catalog.variables() {
            assert_eq!(loaded.lookup(name).unwrap(), variable);
        }
        for (id, file) in catalog.files() {
            assert_eq!(loaded.file(id).unwrap(), file);
        }
    }

    #[test]
    fn several_axis_groups_nest_under_axisgroups() {
        let reader = MemoryReader::new()
            .with_file(
                "a.nc",
                SourceFile::new()
                    .with_dimension("lat", 2)
                    .with_dimension("lev", 3)
                    .with_variable("T", ElementType::Float, &["lev", "lat"], &[]),
            )
            .with_file(
                "b.nc",
                SourceFile::new()
                    .with_dimension("lat", 2)
                    .with_variable("T", ElementType::Float, &["lat"], &[]),
            );
        let mut catalog = Catalog::default();
        catalog.ingest(&reader, Path::new(""), ["a.nc", "b.nc"]).unwrap();

        let value = to_value(&catalog);
        let t = &value["variables"]["T"];
        assert!(t.get("axisids").is_none());
        assert_eq!(t["axisgroups"]["0"]["axisids"], json!(["lat"]));
        assert_eq!(t["axisgroups"]["1"]["axisids"], json!(["lev", "lat"]));
        assert_eq!(t["axisgroups"]["1"]["subaxismap"], json!([["0", "0", "0"]]));

        let loaded = from_json(&value.to_string(), CatalogConfig::default()).unwrap();
        assert_eq!(loaded.lookup("T").unwrap(), catalog.lookup("T").unwrap());
    }

    #[test]
    fn rejects_conflicting_layouts() {
        let both_axis = json!({
            "dataset": {},
            "file": {},
            "axes": { "x": { "datatype": "Int", "size": 1, "values": [1],
                             "subaxes": { "0": { "size": 1, "values": [1] } } } },
            "variables": {}
        });
        let err = from_json(&both_axis.to_string(), CatalogConfig::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));

        let both_variable = json!({
            "dataset": {},
            "axes": { "x": { "datatype": "None", "size": 1 } },
            "file": { "0": { "name": "a.nc", "axes": [["x", "0"]] } },
            "variables": { "v": { "datatype": "Float", "axisids": ["x"],
                                  "subaxismap": [["0", "0"]],
                                  "axisgroups": {} } }
        });
        assert!(from_json(&both_variable.to_string(), CatalogConfig::default()).is_err());
    }

    #[test]
    fn rejects_bad_rows_and_dangling_references() {
        let base = |rows: Value| {
            json!({
                "dataset": {},
                "axes": { "x": { "datatype": "None", "size": 1 } },
                "file": { "0": { "name": "a.nc", "axes": [["x", "0"]] } },
                "variables": { "v": { "datatype": "Float", "axisids": ["x"], "subaxismap": rows } }
            })
            .to_string()
        };
        let config = CatalogConfig::default;

        assert!(from_json(&base(json!([["0", "0"]])), config()).is_ok());
        assert!(from_json(&base(json!([["0"]])), config()).is_err());
        assert!(from_json(&base(json!([["0", "7"]])), config()).is_err());
        assert!(from_json(&base(json!([["3", "0"]])), config()).is_err());
    }

    #[test]
    fn null_axisids_is_a_scalar_group() {
        let text = json!({
            "dataset": {},
            "axes": {},
            "file": { "0": { "name": "a.nc", "axes": [], "version": 3 } },
            "variables": { "gw": { "datatype": "Double", "units": "1",
                                   "axisids": null, "subaxismap": [["0"]] } }
        })
        .to_string();
        let catalog = from_json(&text, CatalogConfig::default()).unwrap();

        let gw = catalog.lookup("gw").unwrap();
        assert_eq!(gw.locate(&[], &[]), Some("0"));
        assert_eq!(gw.attributes.units, "1");
        assert_eq!(catalog.file("0").unwrap().attributes.get("version"), Some("3"));
    }

    #[test]
    fn loaded_catalog_continues_file_ids() {
        let catalog = sample(&[vec![0, 1], vec![2, 3]]);
        let mut loaded = from_json(&to_json(&catalog, false).unwrap(), CatalogConfig::first_writer_wins()).unwrap();
        let reader = MemoryReader::new().with_file(
            "g.nc",
            SourceFile::new()
                .with_attribute("Conventions", "CF-1.6")
                .with_coordinate("time", AxisValues::Int(vec![4, 5]), &[("units", "days")])
                .with_coordinate(
                    "lat",
                    AxisValues::Float(vec![0.1, f32::NAN]),
                    &[("units", "degrees_north"), ("long_name", "latitude")],
                )
                .with_dimension("nbnd", 2)
                .with_variable("T", ElementType::Float, &["time", "lat"], &[("units", "K")]),
        );

        loaded.ingest(&reader, Path::new(""), ["g.nc"]).unwrap();
        assert_eq!(loaded.file("2").unwrap().axis_variant("time"), Some("2"));
        assert_eq!(loaded.axis("lat").unwrap().variants().len(), 1);
    }

    #[test]
    fn missing_sections_and_layouts_are_rejected() {
        let config = CatalogConfig::default;
        let err = from_json("{}", config()).unwrap_err();
        assert!(err.to_string().contains("\"dataset\""), "{err}");
        let err = from_json(r#"{"dataset": {}}"#, config()).unwrap_err();
        assert!(err.to_string().contains("\"file\""), "{err}");
        let err = from_json(r#"{"dataset": {}, "file": {}, "variables": {}}"#, config()).unwrap_err();
        assert!(err.to_string().contains("\"axes\""), "{err}");

        let bare_variable = json!({
            "dataset": {},
            "file": {},
            "axes": {},
            "variables": { "T": { "datatype": "Float" } }
        });
        let err = from_json(&bare_variable.to_string(), config()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
        assert!(err.to_string().contains("axisgroups"), "{err}");

        let empty = json!({ "dataset": {}, "file": {}, "axes": {}, "variables": {} });
        assert!(from_json(&empty.to_string(), config()).unwrap().files().next().is_none());
    }

    #[test]
    fn infinities_survive_a_reload() {
        let reader = MemoryReader::new().with_file(
            "a.nc",
            SourceFile::new().with_coordinate(
                "edge",
                AxisValues::Double(vec![f64::NEG_INFINITY, 0.0, f64::INFINITY, f64::NAN]),
                &[],
            ),
        );
        let mut catalog = Catalog::default();
        catalog.ingest(&reader, Path::new(""), ["a.nc"]).unwrap();

        let value = to_value(&catalog);
        assert_eq!(value["axes"]["edge"]["values"], json!(["-inf", 0.0, "inf", null]));

        let loaded = from_json(&value.to_string(), CatalogConfig::default()).unwrap();
        let edge = loaded.axis("edge").unwrap();
        let original = catalog.axis("edge").unwrap();
        assert!(edge.variant("0").unwrap().matches(original.variant("0").unwrap(), 0.0));
        assert!(!edge.variant("0").unwrap().matches(
            &SubAxis::new(4, AxisValues::Double(vec![f64::NAN, 0.0, f64::NAN, f64::NAN])),
            0.0
        ));
    }

    #[test]
    fn subaxis_must_share_the_axis_datatype() {
        let document = |subaxis: Value| {
            json!({
                "dataset": {},
                "file": {},
                "axes": { "x": { "datatype": "Int", "subaxes": { "0": subaxis } } },
                "variables": {}
            })
            .to_string()
        };
        let config = CatalogConfig::default;

        assert!(from_json(&document(json!({ "size": 1, "values": [1] })), config()).is_ok());
        assert!(from_json(
            &document(json!({ "datatype": "Int", "size": 1, "values": [1] })),
            config()
        )
        .is_ok());
        let err = from_json(
            &document(json!({ "datatype": "Double", "size": 1, "values": [1.0] })),
            config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("differs from axis datatype"), "{err}");
        assert!(from_json(&document(json!({ "size": -1, "values": [] })), config()).is_err());
    }
}

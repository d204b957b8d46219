use super::{
    DatasetReader, RawAttributes, SourceCoordinate, SourceDimension, SourceFile, SourceVariable,
};
use crate::attributes::ElementType;
use crate::axis::AxisValues;
use crate::error::{CatalogError, Result};
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use std::path::Path;

/// Reads NetCDF files through the system netCDF-C library.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfReader;

impl NetcdfReader {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetReader for NetcdfReader {
    fn open(&self, path: &Path) -> Result<SourceFile> {
        let file = netcdf::open(path).map_err(|e| CatalogError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let fail = |e: netcdf::Error| CatalogError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let attributes = read_attributes(file.attributes()).map_err(fail)?;

        let mut dimensions = Vec::new();
        for dim in file.dimensions() {
            let name = dim.name();
            let coordinate = match file.variable(&name) {
                Some(var) => Some(read_coordinate(&var, dim.len()).map_err(fail)?),
                None => None,
            };
            dimensions.push(SourceDimension {
                size: dim.len(),
                name,
                coordinate,
            });
        }

        let mut variables = Vec::new();
        for var in file.variables() {
            let name = var.name();
            if dimensions.iter().any(|d| d.name == name) {
                continue;
            }
            variables.push(SourceVariable {
                element_type: element_type(&var.vartype()),
                dimensions: var.dimensions().iter().map(|d| d.name()).collect(),
                attributes: read_attributes(var.attributes()).map_err(fail)?,
                name,
            });
        }

        Ok(SourceFile {
            attributes,
            dimensions,
            variables,
        })
    }
}

fn read_coordinate(
    var: &netcdf::Variable<'_>,
    size: usize,
) -> std::result::Result<SourceCoordinate, netcdf::Error> {
    let element_type = element_type(&var.vartype());
    let dimensions: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    // Only 1-D numeric coordinates are loaded; the catalog rejects the rest.
    let values = if dimensions.len() == 1 && var.len() == size {
        match element_type {
            ElementType::Int => AxisValues::Int(var.get_values::<i32, _>(..)?),
            ElementType::Float => AxisValues::Float(var.get_values::<f32, _>(..)?),
            ElementType::Double => AxisValues::Double(var.get_values::<f64, _>(..)?),
            _ => AxisValues::Empty,
        }
    } else {
        AxisValues::Empty
    };
    Ok(SourceCoordinate {
        element_type,
        dimensions,
        attributes: read_attributes(var.attributes())?,
        values,
    })
}

fn read_attributes<'a>(
    attributes: impl Iterator<Item = netcdf::Attribute<'a>>,
) -> std::result::Result<RawAttributes, netcdf::Error> {
    attributes
        .map(|attr| Ok((attr.name().to_string(), attribute_text(attr.value()?))))
        .collect()
}

fn element_type(vartype: &NcVariableType) -> ElementType {
    match vartype {
        NcVariableType::Int(IntType::I8) | NcVariableType::Int(IntType::U8) => ElementType::Byte,
        NcVariableType::Int(IntType::I16) | NcVariableType::Int(IntType::U16) => ElementType::Short,
        NcVariableType::Int(IntType::I32) | NcVariableType::Int(IntType::U32) => ElementType::Int,
        NcVariableType::Int(IntType::I64) | NcVariableType::Int(IntType::U64) => ElementType::Int64,
        NcVariableType::Float(FloatType::F32) => ElementType::Float,
        NcVariableType::Float(FloatType::F64) => ElementType::Double,
        NcVariableType::Char => ElementType::Char,
        NcVariableType::String => ElementType::String,
        _ => ElementType::None,
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(unreachable_patterns)]
fn attribute_text(value: AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s,
        AttributeValue::Strs(v) => v.join(", "),
        AttributeValue::Uchar(x) => x.to_string(),
        AttributeValue::Uchars(v) => join(&v),
        AttributeValue::Schar(x) => x.to_string(),
        AttributeValue::Schars(v) => join(&v),
        AttributeValue::Ushort(x) => x.to_string(),
        AttributeValue::Ushorts(v) => join(&v),
        AttributeValue::Short(x) => x.to_string(),
        AttributeValue::Shorts(v) => join(&v),
        AttributeValue::Uint(x) => x.to_string(),
        AttributeValue::Uints(v) => join(&v),
        AttributeValue::Int(x) => x.to_string(),
        AttributeValue::Ints(v) => join(&v),
        AttributeValue::Ulonglong(x) => x.to_string(),
        AttributeValue::Ulonglongs(v) => join(&v),
        AttributeValue::Longlong(x) => x.to_string(),
        AttributeValue::Longlongs(v) => join(&v),
        AttributeValue::Float(x) => x.to_string(),
        AttributeValue::Floats(v) => join(&v),
        AttributeValue::Double(x) => x.to_string(),
        AttributeValue::Doubles(v) => join(&v),
        other => format!("{other:?}"),
    }
}

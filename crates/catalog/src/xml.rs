//! CDML-style XML projection of a [`Catalog`].

use crate::attributes::{AttributeSet, ElementType};
use crate::catalog::Catalog;
use crate::error::Result;
use crate::output::{write_primary, WriteOutcome};
use crate::variable::{SliceToFile, VariableInfo};
use std::fmt::Write as _;
use std::path::Path;

const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";
const DOCTYPE: &str =
    "<!DOCTYPE dataset SYSTEM \"http://www-pcmdi.llnl.gov/software/cdms/cdml.dtd\">";
const INDENT: &str = "    ";

#[derive(Debug, Default)]
struct Element {
    name: &'static str,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn attr(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    /// Set an attribute, replacing an earlier value of the same name.
    fn set(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    fn render(&self, depth: usize, out: &mut String) {
        let pad = INDENT.repeat(depth);
        out.push_str(&pad);
        out.push('<');
        out.push_str(self.name);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, xml_escape(value));
        }

        match (&self.text, self.children.is_empty()) {
            (None, true) => out.push_str(" />\n"),
            (Some(text), true) => {
                let _ = writeln!(out, ">{}</{}>", escape_text(text), self.name);
            }
            (text, false) => {
                out.push_str(">\n");
                if let Some(text) = text {
                    let _ = writeln!(out, "{pad}{INDENT}{}", escape_text(text));
                }
                for child in &self.children {
                    child.render(depth + 1, out);
                }
                let _ = writeln!(out, "{pad}</{}>", self.name);
            }
        }
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Text content only needs markup characters escaped.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Key attributes become XML attributes, others become `attr` children.
fn with_attributes(mut element: Element, set: &AttributeSet) -> Element {
    for (name, value) in set.key_attributes() {
        element.set(name, value);
    }
    for (name, value) in set.other_attributes() {
        element.push(
            Element::new("attr")
                .attr("name", name)
                .attr("datatype", "String")
                .text(value.as_str()),
        );
    }
    element
}

fn quoted_list<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let quoted: Vec<String> = items.map(|item| format!("\"{item}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

fn subaxis_map_text(slices: &SliceToFile) -> String {
    let rows: Vec<String> = slices
        .iter()
        .map(|(variant_ids, file_id)| quoted_list(variant_ids.iter().chain(std::iter::once(file_id))))
        .collect();
    format!("[{}]", rows.join(", "))
}

fn variable_element(variable: &VariableInfo) -> Element {
    let element = Element::new("variable")
        .attr("id", variable.name())
        .attr("datatype", variable.attributes.element_type.as_str())
        .attr("units", &variable.attributes.units);
    let mut element = with_attributes(element, &variable.attributes);

    let groups = variable.location_index();
    for (axis_names, slices) in groups {
        let ids = Element::new("axisids").text(quoted_list(axis_names.iter()));
        let map = Element::new("subaxismap").text(subaxis_map_text(slices));
        if groups.len() > 1 {
            let mut group = Element::new("axisgroup");
            group.push(ids);
            group.push(map);
            element.push(group);
        } else {
            element.push(ids);
            element.push(map);
        }
    }
    element
}

/// Render the catalog as an XML document.
pub fn to_xml(catalog: &Catalog) -> String {
    let mut dataset = with_attributes(Element::new("dataset"), &catalog.collection);

    for (id, file) in catalog.files.iter() {
        let element = Element::new("file")
            .attr("id", id)
            .attr("name", file.filename());
        let mut element = with_attributes(element, &file.attributes);
        for (axis, variant) in file.axis_variants() {
            element.push(
                Element::new("subaxis")
                    .attr("axis", axis)
                    .attr("subaxis", variant),
            );
        }
        dataset.push(element);
    }

    for (name, axis) in catalog.axes.iter() {
        let element = Element::new("axis")
            .attr("id", name)
            .attr("units", &axis.attributes.units)
            .attr("datatype", axis.element_type().as_str());
        let mut element = with_attributes(element, &axis.attributes);

        let variants = axis.variants();
        if variants.len() == 1 {
            if let Some(variant) = variants.values().next() {
                if variant.element_type() != ElementType::None {
                    element.text = Some(variant.values.to_text());
                }
            }
        } else {
            for (id, variant) in variants.iter() {
                let mut sub = Element::new("subaxis")
                    .attr("id", id)
                    .attr("size", &variant.size.to_string());
                if variant.element_type() != ElementType::None {
                    sub = sub.text(variant.values.to_text());
                }
                element.push(sub);
            }
        }
        dataset.push(element);
    }

    for (_, variable) in catalog.variables.iter() {
        dataset.push(variable_element(variable));
    }

    let mut out = String::new();
    out.push_str(DECLARATION);
    out.push('\n');
    out.push_str(DOCTYPE);
    out.push('\n');
    dataset.render(0, &mut out);
    out
}

pub fn write_xml_file(catalog: &Catalog, path: &Path) -> Result<WriteOutcome> {
    write_primary(path, || Ok(to_xml(catalog)))
}

//! Loading input files into `GenericNode` trees.
//!
//! XML/GML parses into the same shape the upstream parser produced:
//! attributes as `@_`-prefixed fields, inline text under `#text`,
//! text-only elements collapsed to plain strings, repeated siblings
//! collected into lists. JSON maps directly onto the variants. CSV
//! becomes a list of per-row field maps.

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;
use std::path::Path;

use crate::document::{GenericNode, TEXT_FIELD, insert_child};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xml,
    Json,
    Csv,
}

/// Detects the input format from the file extension.
pub fn detect_input_format(path: &Path) -> Option<InputFormat> {
    let ext = path.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "gml" | "xml" => Some(InputFormat::Xml),
        "json" | "geojson" => Some(InputFormat::Json),
        "csv" => Some(InputFormat::Csv),
        _ => None,
    }
}

/// Reads and parses a document, detecting the format from the extension.
pub fn load_document(path: &Path) -> Result<GenericNode> {
    let format = detect_input_format(path)
        .with_context(|| format!("IO: Could not detect input format of {path:?}"))?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("IO: Failed to read {path:?}"))?;
    match format {
        InputFormat::Xml => {
            parse_xml(&content).with_context(|| format!("IO: Failed to parse XML in {path:?}"))
        }
        InputFormat::Json => {
            parse_json(&content).with_context(|| format!("IO: Failed to parse JSON in {path:?}"))
        }
        InputFormat::Csv => {
            parse_csv(&content).with_context(|| format!("IO: Failed to parse CSV in {path:?}"))
        }
    }
}

/// Parses an XML document into a map keyed by the root element name.
pub fn parse_xml(content: &str) -> Result<GenericNode> {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();

    // Stack of open elements; the sentinel at the bottom collects roots.
    let mut stack: Vec<(String, BTreeMap<String, GenericNode>)> =
        vec![(String::new(), BTreeMap::new())];

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let mut map = BTreeMap::new();
                for attr in start.attributes() {
                    let attr = attr?;
                    let key = format!("@_{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let value = attr.unescape_value()?.into_owned();
                    map.insert(key, GenericNode::Text(value));
                }
                stack.push((name, map));
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let mut map = BTreeMap::new();
                for attr in start.attributes() {
                    let attr = attr?;
                    let key = format!("@_{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let value = attr.unescape_value()?.into_owned();
                    map.insert(key, GenericNode::Text(value));
                }
                let (_, parent) = stack
                    .last_mut()
                    .context("IO: XML element outside any root")?;
                insert_child(parent, &name, simplify_element(map));
            }
            Event::Text(text) => {
                let value = text.unescape()?.into_owned();
                if value.trim().is_empty() {
                    continue;
                }
                let (_, current) = stack.last_mut().context("IO: XML text outside any root")?;
                match current.get_mut(TEXT_FIELD) {
                    Some(GenericNode::Text(existing)) => existing.push_str(&value),
                    _ => {
                        current.insert(TEXT_FIELD.to_string(), GenericNode::Text(value));
                    }
                }
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                let (_, current) = stack.last_mut().context("IO: XML text outside any root")?;
                match current.get_mut(TEXT_FIELD) {
                    Some(GenericNode::Text(existing)) => existing.push_str(&value),
                    _ => {
                        current.insert(TEXT_FIELD.to_string(), GenericNode::Text(value));
                    }
                }
            }
            Event::End(_) => {
                let (name, map) = stack.pop().context("IO: Unbalanced XML end tag")?;
                if stack.is_empty() {
                    bail!("IO: Unbalanced XML end tag");
                }
                let (_, parent) = stack.last_mut().context("IO: Unbalanced XML end tag")?;
                insert_child(parent, &name, simplify_element(map));
            }
            Event::Eof => break,
            // Declarations, comments, and processing instructions carry no
            // document content.
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        bail!("IO: XML document ended with unclosed elements");
    }
    let (_, roots) = stack.pop().context("IO: Empty XML document")?;
    if roots.is_empty() {
        bail!("IO: XML document has no root element");
    }
    Ok(GenericNode::Map(roots))
}

/// Collapses an element with nothing but inline text to a plain string.
fn simplify_element(map: BTreeMap<String, GenericNode>) -> GenericNode {
    if map.len() == 1
        && let Some(GenericNode::Text(text)) = map.get(TEXT_FIELD)
    {
        return GenericNode::Text(text.clone());
    }
    GenericNode::Map(map)
}

/// Converts parsed JSON into the document tree.
pub fn parse_json(content: &str) -> Result<GenericNode> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("IO: Invalid JSON document")?;
    Ok(from_json_value(value))
}

fn from_json_value(value: serde_json::Value) -> GenericNode {
    match value {
        serde_json::Value::Null => GenericNode::Text(String::new()),
        serde_json::Value::Bool(b) => GenericNode::Text(b.to_string()),
        serde_json::Value::Number(n) => GenericNode::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => GenericNode::Text(s),
        serde_json::Value::Array(items) => {
            GenericNode::List(items.into_iter().map(from_json_value).collect())
        }
        serde_json::Value::Object(entries) => GenericNode::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, from_json_value(v)))
                .collect(),
        ),
    }
}

/// Parses CSV into a list of per-row maps keyed by the header names.
pub fn parse_csv(content: &str) -> Result<GenericNode> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers = reader
        .headers()
        .context("IO: CSV document has no header row")?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("IO: Malformed CSV record")?;
        let mut map = BTreeMap::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            map.insert(header.to_string(), GenericNode::Text(field.to_string()));
        }
        rows.push(GenericNode::Map(map));
    }
    Ok(GenericNode::List(rows))
}

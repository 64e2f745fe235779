//! Re-serialization of a document tree as GML/XML.
//!
//! The inverse of the `io` parser: `@_`-prefixed fields become element
//! attributes, `#text` becomes inline text, lists repeat their element
//! name. Field order within an element follows the map's field ordering.

use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::document::{ATTR_PREFIX, GenericNode, TEXT_FIELD, format_number};

/// Serializes the document to an XML string with a standard declaration.
pub fn write_gml(doc: &GenericNode) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("Export: Failed to write XML declaration")?;

    if let Some(map) = doc.as_map() {
        for (name, value) in map {
            write_element(&mut writer, name, value)?;
        }
    }

    String::from_utf8(writer.into_inner()).context("Export: Serialized XML is not valid UTF-8")
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, node: &GenericNode) -> Result<()> {
    match node {
        GenericNode::List(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        GenericNode::Map(map) => {
            let mut start = BytesStart::new(name);
            for (field, value) in map {
                if let Some(attr_name) = field.strip_prefix(ATTR_PREFIX)
                    && let Some(text) = value.scalar_string()
                {
                    start.push_attribute((attr_name, text.as_str()));
                }
            }

            let text = map.get(TEXT_FIELD).and_then(|v| v.scalar_string());
            let children: Vec<(&String, &GenericNode)> = map
                .iter()
                .filter(|(field, _)| !field.starts_with(ATTR_PREFIX) && field.as_str() != TEXT_FIELD)
                .collect();

            if text.is_none() && children.is_empty() {
                writer
                    .write_event(Event::Empty(start))
                    .with_context(|| format!("Export: Failed to write element {name}"))?;
                return Ok(());
            }

            writer
                .write_event(Event::Start(start))
                .with_context(|| format!("Export: Failed to write element {name}"))?;
            if let Some(text) = text {
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .with_context(|| format!("Export: Failed to write text of {name}"))?;
            }
            for (field, value) in children {
                write_element(writer, field, value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .with_context(|| format!("Export: Failed to close element {name}"))?;
            Ok(())
        }
        GenericNode::Text(value) => write_text_element(writer, name, value),
        GenericNode::Number(value) => write_text_element(writer, name, &format_number(*value)),
    }
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .with_context(|| format!("Export: Failed to write element {name}"))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .with_context(|| format!("Export: Failed to write text of {name}"))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .with_context(|| format!("Export: Failed to close element {name}"))?;
    Ok(())
}

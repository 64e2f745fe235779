//! Tabular projection of a city-model document.
//!
//! Each requested field resolves per building by subtree search; a field
//! may be qualified as `tag@=qualifier` to select the element whose
//! code-space or unit-of-measure attribute equals the qualifier. Missing
//! fields resolve to an empty string. When a field resolves to several
//! values inside one building, the extra values spill into numbered
//! overflow columns appended after the requested ones.
//!
//! Rows are comma-joined with no quoting or escaping; fields containing
//! delimiters are a known limitation of the format.

use crate::document::{
    ATTR_NAME, ATTR_PREFIX, GEN_VALUE, GML_ID_FIELD, GenericNode, LOD0_ROOF_EDGE, POS_LIST,
    city_object_members,
};

#[derive(Debug, Clone)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Projects the requested fields of every city-object member into a table.
/// Rows follow the building order of the document; columns follow the
/// requested-field order, then overflow columns.
pub fn project_csv(doc: &GenericNode, fields: &[String]) -> CsvTable {
    let members = city_object_members(doc);
    let resolved: Vec<Vec<Vec<String>>> = members
        .iter()
        .map(|member| {
            fields
                .iter()
                .map(|field| resolve_field(member, field))
                .collect()
        })
        .collect();

    // Overflow width per field across all rows.
    let mut overflow = vec![0usize; fields.len()];
    for row in &resolved {
        for (i, values) in row.iter().enumerate() {
            overflow[i] = overflow[i].max(values.len().saturating_sub(1));
        }
    }

    let mut header: Vec<String> = fields.to_vec();
    for (i, field) in fields.iter().enumerate() {
        for n in 0..overflow[i] {
            header.push(format!("{}_{}", field, n + 2));
        }
    }

    let rows = resolved
        .into_iter()
        .map(|row| {
            let mut out: Vec<String> = row
                .iter()
                .map(|values| values.first().cloned().unwrap_or_default())
                .collect();
            for (i, values) in row.iter().enumerate() {
                for n in 0..overflow[i] {
                    out.push(values.get(n + 1).cloned().unwrap_or_default());
                }
            }
            out
        })
        .collect();

    CsvTable { header, rows }
}

/// Serializes the table: comma-joined fields, newline-separated rows.
pub fn to_csv_string(table: &CsvTable) -> String {
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    lines.push(table.header.join(","));
    for row in &table.rows {
        lines.push(row.join(","));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Every value the requested field resolves to within one building.
pub fn resolve_field(member: &GenericNode, field: &str) -> Vec<String> {
    let (tag, qualifier) = match field.split_once("@=") {
        Some((tag, qualifier)) => (tag, Some(qualifier)),
        None => (field, None),
    };
    let mut values = Vec::new();
    collect_field(member, tag, qualifier, &mut values);
    values
}

fn collect_field(node: &GenericNode, tag: &str, qualifier: Option<&str>, out: &mut Vec<String>) {
    let map = match node {
        GenericNode::Map(map) => map,
        GenericNode::List(items) => {
            for item in items {
                collect_field(item, tag, qualifier, out);
            }
            return;
        }
        _ => return,
    };

    if let Some(qualifier) = qualifier {
        if let Some(value) = map.get(tag)
            && qualifier_matches(value, qualifier)
            && let Some(text) = value.inline_text()
        {
            out.push(text.to_string());
        }
    } else {
        // The Building identifier itself.
        if tag == GML_ID_FIELD
            && let Some(id) = node.building_id()
        {
            out.push(id.to_string());
        }

        // A generic attribute named like the field: its sibling value.
        if map.get(ATTR_NAME).and_then(GenericNode::inline_text) == Some(tag)
            && let Some(value) = map.get(GEN_VALUE).and_then(|v| v.scalar_string())
        {
            out.push(value);
        }

        if tag == POS_LIST
            && let Some(text) = roof_edge_pos_list(map.get(LOD0_ROOF_EDGE))
        {
            // Fixed footprint path; skip the subtree so the generic match
            // below does not see the same posList again.
            out.push(text.to_string());
            for (name, child) in map {
                if name != LOD0_ROOF_EDGE {
                    collect_field(child, tag, qualifier, out);
                }
            }
            return;
        }

        if tag != GML_ID_FIELD
            && let Some(value) = map.get(tag).and_then(|v| v.scalar_string())
        {
            out.push(value);
        }
    }

    for child in map.values() {
        collect_field(child, tag, qualifier, out);
    }
}

/// Whether any attribute of the element (code-space, unit-of-measure, ...)
/// carries the requested qualifier value.
fn qualifier_matches(value: &GenericNode, qualifier: &str) -> bool {
    let Some(map) = value.as_map() else {
        return false;
    };
    map.iter().any(|(name, attr)| {
        name.starts_with(ATTR_PREFIX) && attr.inline_text() == Some(qualifier)
    })
}

/// The `bldg:lod0RoofEdge/.../gml:posList` coordinate text, when the
/// document follows the standard footprint layout.
fn roof_edge_pos_list(roof_edge: Option<&GenericNode>) -> Option<&str> {
    roof_edge?
        .get("gml:MultiSurface")?
        .get("gml:surfaceMember")?
        .get("gml:Polygon")?
        .get("gml:exterior")?
        .get("gml:LinearRing")?
        .get(POS_LIST)?
        .inline_text()
}

//! The generic document tree.
//!
//! Parsed inputs (GML/XML, JSON, CSV) are delivered as `GenericNode` trees:
//! a closed variant type of scalars, lists, and field maps. XML attributes
//! live in the enclosing map under `@_`-prefixed field names and inline text
//! under `#text`, mirroring the convention of the upstream XML parser.

use std::collections::BTreeMap;

/// Field-name prefix marking an XML attribute of the enclosing element.
pub const ATTR_PREFIX: &str = "@_";
/// Field name holding an element's inline text content.
pub const TEXT_FIELD: &str = "#text";

pub const CITY_MODEL: &str = "core:CityModel";
pub const CITY_OBJECT_MEMBER: &str = "core:cityObjectMember";
pub const BUILDING: &str = "bldg:Building";
pub const GML_ID_ATTR: &str = "@_gml:id";
pub const GML_ID_FIELD: &str = "gml:id";
pub const MEASURED_HEIGHT: &str = "bldg:measuredHeight";
pub const LOCALITY_NAME: &str = "xAL:LocalityName";
pub const POS_LIST: &str = "gml:posList";
pub const STRING_ATTRIBUTE: &str = "gen:stringAttribute";
pub const ATTR_NAME: &str = "@_name";
pub const GEN_VALUE: &str = "gen:value";
pub const LOD0_ROOF_EDGE: &str = "bldg:lod0RoofEdge";

/// A node of a parsed document: scalar text, number, ordered list, or a
/// mapping from field name to child node. Field names within one mapping
/// are unique; repeated XML siblings are collected into a `List`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenericNode {
    Text(String),
    Number(f64),
    List(Vec<GenericNode>),
    Map(BTreeMap<String, GenericNode>),
}

impl GenericNode {
    pub fn text(value: impl Into<String>) -> Self {
        GenericNode::Text(value.into())
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, GenericNode>> {
        match self {
            GenericNode::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[GenericNode]> {
        match self {
            GenericNode::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a field on a mapping node. `None` for scalars and lists.
    pub fn get(&self, field: &str) -> Option<&GenericNode> {
        self.as_map().and_then(|map| map.get(field))
    }

    /// The node's inline text: the string itself for a `Text` node, or the
    /// `#text` field of a mapping (an element that carried attributes).
    pub fn inline_text(&self) -> Option<&str> {
        match self {
            GenericNode::Text(value) => Some(value),
            GenericNode::Map(map) => match map.get(TEXT_FIELD) {
                Some(GenericNode::Text(value)) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// The node rendered as a single scalar string, if it is one.
    /// Numbers format without a trailing `.0`, so `0` becomes `"0"`.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            GenericNode::Text(value) => Some(value.clone()),
            GenericNode::Number(value) => Some(format_number(*value)),
            GenericNode::Map(_) => self.inline_text().map(str::to_string),
            GenericNode::List(_) => None,
        }
    }

    /// True for `Text("")` and empty lists; used to skip merging blanks.
    pub fn is_empty_value(&self) -> bool {
        match self {
            GenericNode::Text(value) => value.is_empty(),
            GenericNode::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// The identifier of a `bldg:Building` child of this node, if any.
    pub fn building_id(&self) -> Option<&str> {
        self.get(BUILDING)
            .and_then(|building| building.get(GML_ID_ATTR))
            .and_then(GenericNode::inline_text)
    }
}

/// The `core:cityObjectMember` entries of a city-model document. A single
/// member parses as a lone map; it is returned as a one-element slice.
pub fn city_object_members(doc: &GenericNode) -> Vec<&GenericNode> {
    match doc.get(CITY_MODEL).and_then(|model| model.get(CITY_OBJECT_MEMBER)) {
        Some(GenericNode::List(items)) => items.iter().collect(),
        Some(member @ GenericNode::Map(_)) => vec![member],
        _ => Vec::new(),
    }
}

/// Formats a float the way the source documents carry numbers: integral
/// values without a decimal point.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Inserts a child under `name`, collecting repeated names into a list.
pub fn insert_child(map: &mut BTreeMap<String, GenericNode>, name: &str, node: GenericNode) {
    match map.get_mut(name) {
        Some(GenericNode::List(items)) => items.push(node),
        Some(existing) => {
            let first = std::mem::replace(existing, GenericNode::List(Vec::new()));
            if let GenericNode::List(items) = existing {
                items.push(first);
                items.push(node);
            }
        }
        None => {
            map.insert(name.to_string(), node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_text_reads_text_field_of_attributed_element() {
        let mut map = BTreeMap::new();
        map.insert("@_uom".to_string(), GenericNode::text("m"));
        map.insert(TEXT_FIELD.to_string(), GenericNode::text("12.5"));
        let node = GenericNode::Map(map);
        assert_eq!(node.inline_text(), Some("12.5"));
    }

    #[test]
    fn format_number_drops_trailing_zero() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(12.5), "12.5");
    }

    #[test]
    fn insert_child_promotes_repeated_names_to_list() {
        let mut map = BTreeMap::new();
        insert_child(&mut map, "gen:stringAttribute", GenericNode::text("a"));
        insert_child(&mut map, "gen:stringAttribute", GenericNode::text("b"));
        match map.get("gen:stringAttribute") {
            Some(GenericNode::List(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn building_id_reads_gml_id_attribute() {
        let mut building = BTreeMap::new();
        building.insert(GML_ID_ATTR.to_string(), GenericNode::text("bldg_1"));
        let mut member = BTreeMap::new();
        member.insert(BUILDING.to_string(), GenericNode::Map(building));
        let node = GenericNode::Map(member);
        assert_eq!(node.building_id(), Some("bldg_1"));
    }
}

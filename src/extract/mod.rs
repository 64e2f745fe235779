//! Key extraction from the two input documents.
//!
//! `extract_keys` walks the secondary dataset and yields every record that
//! carries the target field, with a normalized join key. `extract_building_key`
//! is the CityGML-aware variant for the primary document: it threads the
//! enclosing building's identifier down the recursion as an explicit
//! accumulator and knows the well-known CityGML field shapes.

use crate::document::{
    ATTR_NAME, GEN_VALUE, GML_ID_FIELD, GenericNode, LOCALITY_NAME, MEASURED_HEIGHT, POS_LIST,
};
use crate::keys::{
    JoinKey, coordinate_key, is_numeric_list, numbers_key, pair_coordinates, split_numeric_tokens,
    strip_quotes, tokenize,
};

/// A secondary record paired with its normalized join key.
#[derive(Debug, Clone)]
pub struct SecondaryKey {
    pub key: JoinKey,
    pub record: GenericNode,
}

/// A primary entry: the join key found under one city-object member (if
/// any) and the identifier of its enclosing building (if any). A `None`
/// key is the "no value for this field" sentinel, not an error.
#[derive(Debug, Clone)]
pub struct BuildingKey {
    pub key: Option<JoinKey>,
    pub building_id: Option<String>,
}

/// Collects every sub-record of `doc` that carries `target_field`, with a
/// join key derived from the field value. A record can appear both for its
/// own field and for nested matches. Never mutates the input; no ordering
/// guarantee across records.
pub fn extract_keys(doc: &GenericNode, target_field: &str) -> Vec<SecondaryKey> {
    let mut found = Vec::new();
    collect_keys(doc, target_field, &mut found);
    found
}

fn collect_keys(node: &GenericNode, target_field: &str, found: &mut Vec<SecondaryKey>) {
    match node {
        GenericNode::Map(map) => {
            if let Some(value) = map.get(target_field)
                && let Some(key) = secondary_key(value)
            {
                found.push(SecondaryKey {
                    key,
                    record: node.clone(),
                });
            }
            for child in map.values() {
                if matches!(child, GenericNode::Map(_) | GenericNode::List(_)) {
                    collect_keys(child, target_field, found);
                }
            }
        }
        GenericNode::List(items) => {
            for item in items {
                collect_keys(item, target_field, found);
            }
        }
        _ => {}
    }
}

/// Derives a join key from a secondary field value.
///
/// Numeric lists go through the coordinate pairing rule; fully-numeric
/// strings keep their raw numbers (no triple dropping on this path);
/// anything else is quote-stripped and tokenized.
fn secondary_key(value: &GenericNode) -> Option<JoinKey> {
    match value {
        GenericNode::Number(n) => Some(JoinKey::Number(*n)),
        GenericNode::List(items) => {
            let numbers: Vec<f64> = items
                .iter()
                .filter_map(|item| match item {
                    GenericNode::Number(n) => Some(*n),
                    GenericNode::Text(t) => t.trim().parse().ok(),
                    _ => None,
                })
                .collect();
            if numbers.is_empty() {
                return None;
            }
            let coords = pair_coordinates(&numbers);
            match coords.len() {
                0 => None,
                1 => Some(JoinKey::Point(coords[0])),
                _ => Some(JoinKey::Polygon(coords)),
            }
        }
        GenericNode::Text(text) => {
            if is_numeric_list(text) {
                numbers_key(split_numeric_tokens(text))
            } else {
                let tokens = tokenize(&strip_quotes(text));
                if tokens.is_empty() {
                    None
                } else {
                    Some(JoinKey::Tokens(tokens))
                }
            }
        }
        GenericNode::Map(_) => None,
    }
}

/// Finds the join key for `target_field` under one city-object fragment,
/// carrying the enclosing building identifier down the recursion.
pub fn extract_building_key(fragment: &GenericNode, target_field: &str) -> BuildingKey {
    search_fragment(fragment, target_field, None)
}

fn search_fragment(
    node: &GenericNode,
    target_field: &str,
    inherited_id: Option<&str>,
) -> BuildingKey {
    let map = match node {
        GenericNode::Map(map) => map,
        GenericNode::List(items) => {
            for item in items {
                let result = search_fragment(item, target_field, inherited_id);
                if result.key.is_some() {
                    return result;
                }
            }
            return BuildingKey {
                key: None,
                building_id: inherited_id.map(str::to_string),
            };
        }
        _ => {
            return BuildingKey {
                key: None,
                building_id: inherited_id.map(str::to_string),
            };
        }
    };

    // A directly contained Building overrides the inherited identifier.
    let current_id = node.building_id().or(inherited_id);

    if let Some(key) = fast_path_key(node, target_field) {
        return BuildingKey {
            key: Some(key),
            building_id: current_id.map(str::to_string),
        };
    }

    for child in map.values() {
        if matches!(child, GenericNode::Map(_) | GenericNode::List(_)) {
            let result = search_fragment(child, target_field, current_id);
            if result.key.is_some() {
                return result;
            }
        }
    }

    BuildingKey {
        key: None,
        building_id: current_id.map(str::to_string),
    }
}

/// The CityGML field shapes checked ahead of the generic lookup.
fn fast_path_key(node: &GenericNode, target_field: &str) -> Option<JoinKey> {
    // gml:id resolves to the Building's own identifier.
    if target_field == GML_ID_FIELD
        && let Some(id) = node.building_id()
    {
        return Some(JoinKey::Text(id.to_string()));
    }

    if target_field == MEASURED_HEIGHT
        && let Some(text) = node.get(MEASURED_HEIGHT).and_then(GenericNode::inline_text)
    {
        return Some(JoinKey::Text(text.to_string()));
    }

    if target_field == LOCALITY_NAME
        && let Some(text) = node.get(LOCALITY_NAME).and_then(GenericNode::inline_text)
    {
        return Some(JoinKey::Text(text.to_string()));
    }

    // A generic attribute whose name matches the target field.
    if node.get(ATTR_NAME).and_then(GenericNode::inline_text) == Some(target_field)
        && let Some(value) = node.get(GEN_VALUE).and_then(|v| v.scalar_string())
    {
        return Some(JoinKey::Text(value));
    }

    // Any other string-valued field: footprint coordinates become a
    // polygon, everything else stays a raw string.
    if let Some(text) = node.get(target_field).and_then(GenericNode::inline_text) {
        if target_field == POS_LIST {
            return coordinate_key(text);
        }
        return Some(JoinKey::Text(text.to_string()));
    }

    None
}

//! Merging matched secondary values into the primary document.
//!
//! The merge is pure: it operates on a deep copy and the original document
//! stays untouched and reusable. For every matched pair, each mapped
//! source field with a non-empty value is appended to the building's
//! `gen:stringAttribute` list. Appending is deliberate product behavior:
//! re-running the merge accumulates attributes, there is no deduplication.

use std::collections::BTreeMap;

use crate::config::AttributeMapping;
use crate::document::{ATTR_NAME, GEN_VALUE, GenericNode, STRING_ATTRIBUTE};
use crate::matching::MatchedPair;

/// Returns a copy of `doc` with the mapped fields of every matched record
/// appended as generic attributes to the identified buildings.
pub fn merge_attributes(
    doc: &GenericNode,
    pairs: &[MatchedPair],
    mappings: &[AttributeMapping],
) -> GenericNode {
    let mut merged = doc.clone();
    for pair in pairs {
        apply_pair(&mut merged, pair, mappings);
    }
    merged
}

fn apply_pair(node: &mut GenericNode, pair: &MatchedPair, mappings: &[AttributeMapping]) {
    let is_match = node.building_id() == Some(pair.building_id.as_str());
    match node {
        GenericNode::Map(map) => {
            if is_match
                && let Some(GenericNode::Map(building)) = map.get_mut(crate::document::BUILDING)
            {
                append_mapped_fields(building, pair, mappings);
            }
            for child in map.values_mut() {
                apply_pair(child, pair, mappings);
            }
        }
        GenericNode::List(items) => {
            for item in items {
                apply_pair(item, pair, mappings);
            }
        }
        _ => {}
    }
}

fn append_mapped_fields(
    building: &mut BTreeMap<String, GenericNode>,
    pair: &MatchedPair,
    mappings: &[AttributeMapping],
) {
    for mapping in mappings {
        let Some(value) = pair.record.get(&mapping.source) else {
            continue;
        };
        if value.is_empty_value() {
            tracing::debug!(
                "Merge: skipping empty '{}' for building {}",
                mapping.source,
                pair.building_id
            );
            continue;
        }
        push_generic_attribute(building, &mapping.name, value.clone());
    }
}

/// Appends a `{name, value}` generic attribute, creating the attribute
/// list when absent and promoting a single existing entry to a list.
/// Existing attributes are never lost.
fn push_generic_attribute(
    building: &mut BTreeMap<String, GenericNode>,
    name: &str,
    value: GenericNode,
) {
    let mut entry = BTreeMap::new();
    entry.insert(ATTR_NAME.to_string(), GenericNode::text(name));
    entry.insert(GEN_VALUE.to_string(), value);
    let entry = GenericNode::Map(entry);

    match building.get_mut(STRING_ATTRIBUTE) {
        Some(GenericNode::List(items)) => items.push(entry),
        Some(existing) => {
            let first = std::mem::replace(existing, GenericNode::List(Vec::new()));
            if let GenericNode::List(items) = existing {
                items.push(first);
                items.push(entry);
            }
        }
        None => {
            building.insert(STRING_ATTRIBUTE.to_string(), GenericNode::List(vec![entry]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BUILDING, GML_ID_ATTR};

    fn mapping(source: &str, name: &str) -> AttributeMapping {
        AttributeMapping {
            source: source.to_string(),
            name: name.to_string(),
        }
    }

    fn shop_record(name: &str) -> GenericNode {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), GenericNode::text(name));
        GenericNode::Map(map)
    }

    fn city_doc(building_id: &str, extra: Option<(&str, GenericNode)>) -> GenericNode {
        let mut building = BTreeMap::new();
        building.insert(GML_ID_ATTR.to_string(), GenericNode::text(building_id));
        if let Some((key, value)) = extra {
            building.insert(key.to_string(), value);
        }
        let mut member = BTreeMap::new();
        member.insert(BUILDING.to_string(), GenericNode::Map(building));
        let mut model = BTreeMap::new();
        model.insert(
            "core:cityObjectMember".to_string(),
            GenericNode::List(vec![GenericNode::Map(member)]),
        );
        let mut root = BTreeMap::new();
        root.insert("core:CityModel".to_string(), GenericNode::Map(model));
        GenericNode::Map(root)
    }

    fn attribute_count(doc: &GenericNode, building_id: &str) -> usize {
        fn walk(node: &GenericNode, id: &str, count: &mut usize) {
            match node {
                GenericNode::Map(map) => {
                    if node.building_id() == Some(id)
                        && let Some(building) = node.get(BUILDING)
                    {
                        match building.get(STRING_ATTRIBUTE) {
                            Some(GenericNode::List(items)) => *count += items.len(),
                            Some(_) => *count += 1,
                            None => {}
                        }
                    }
                    for child in map.values() {
                        walk(child, id, count);
                    }
                }
                GenericNode::List(items) => {
                    for item in items {
                        walk(item, id, count);
                    }
                }
                _ => {}
            }
        }
        let mut count = 0;
        walk(doc, building_id, &mut count);
        count
    }

    #[test]
    fn merge_never_mutates_the_original() {
        let doc = city_doc("bldg_1", None);
        let before = doc.clone();
        let pairs = vec![MatchedPair {
            building_id: "bldg_1".to_string(),
            record: shop_record("Cafe"),
        }];
        let merged = merge_attributes(&doc, &pairs, &[mapping("name", "shopName")]);

        assert_eq!(doc, before);
        assert_eq!(attribute_count(&merged, "bldg_1"), 1);
    }

    #[test]
    fn repeated_merge_accumulates_attributes() {
        let doc = city_doc("bldg_1", None);
        let pairs = vec![MatchedPair {
            building_id: "bldg_1".to_string(),
            record: shop_record("Cafe"),
        }];
        let mappings = [mapping("name", "shopName")];

        let once = merge_attributes(&doc, &pairs, &mappings);
        let twice = merge_attributes(&once, &pairs, &mappings);
        assert_eq!(attribute_count(&twice, "bldg_1"), 2);
    }

    #[test]
    fn single_existing_attribute_is_promoted_to_list() {
        let mut existing = BTreeMap::new();
        existing.insert(ATTR_NAME.to_string(), GenericNode::text("usage"));
        existing.insert(GEN_VALUE.to_string(), GenericNode::text("residential"));
        let doc = city_doc(
            "bldg_1",
            Some((STRING_ATTRIBUTE, GenericNode::Map(existing))),
        );

        let pairs = vec![MatchedPair {
            building_id: "bldg_1".to_string(),
            record: shop_record("Cafe"),
        }];
        let merged = merge_attributes(&doc, &pairs, &[mapping("name", "shopName")]);

        assert_eq!(attribute_count(&merged, "bldg_1"), 2);
    }

    #[test]
    fn empty_values_and_missing_fields_are_skipped() {
        let doc = city_doc("bldg_1", None);
        let pairs = vec![MatchedPair {
            building_id: "bldg_1".to_string(),
            record: shop_record(""),
        }];
        let merged = merge_attributes(
            &doc,
            &pairs,
            &[mapping("name", "shopName"), mapping("absent", "other")],
        );
        assert_eq!(attribute_count(&merged, "bldg_1"), 0);
    }

    #[test]
    fn unmatched_building_is_left_alone() {
        let doc = city_doc("bldg_2", None);
        let pairs = vec![MatchedPair {
            building_id: "bldg_1".to_string(),
            record: shop_record("Cafe"),
        }];
        let merged = merge_attributes(&doc, &pairs, &[mapping("name", "shopName")]);
        assert_eq!(attribute_count(&merged, "bldg_2"), 0);
    }
}

//! The linkage pipeline: extract, match, merge.

use anyhow::{Result, bail};

use crate::config::LinkConfig;
use crate::document::{GenericNode, city_object_members};
use crate::extract::{BuildingKey, extract_building_key, extract_keys};
use crate::keys::apply_range_policy;
use crate::matching::match_pairs;
use crate::merge::merge_attributes;

/// Joins the secondary dataset onto the primary city model and returns the
/// enriched document. The input documents are never mutated.
///
/// Fails when the primary document carries no city-object members or when
/// no pair matches at all; a partially linkable input is not an error.
pub fn run_linkage(
    primary: &GenericNode,
    secondary: &GenericNode,
    config: &LinkConfig,
) -> Result<GenericNode> {
    let members = city_object_members(primary);
    if members.is_empty() {
        bail!("Pipeline: primary document has no core:cityObjectMember entries");
    }

    let building_keys: Vec<BuildingKey> = members
        .iter()
        .map(|member| {
            let mut entry = extract_building_key(member, &config.primary_field);
            if config.numeric_range_keys {
                entry.key = entry.key.map(apply_range_policy);
            }
            entry
        })
        .collect();
    let with_key = building_keys
        .iter()
        .filter(|entry| entry.key.is_some())
        .count();
    tracing::info!(
        "Extracted keys for {}/{} buildings (field '{}')",
        with_key,
        building_keys.len(),
        config.primary_field
    );

    let secondary_keys = extract_keys(secondary, &config.secondary_field);
    tracing::info!(
        "Extracted {} secondary record(s) (field '{}')",
        secondary_keys.len(),
        config.secondary_field
    );

    let pairs = match_pairs(&building_keys, &secondary_keys);
    if pairs.is_empty() {
        bail!("Pipeline: no building could be linked; no matching pairs were found");
    }
    tracing::info!("Matched {} pair(s)", pairs.len());

    Ok(merge_attributes(primary, &pairs, &config.attributes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttributeMapping;
    use crate::document::{
        BUILDING, CITY_MODEL, CITY_OBJECT_MEMBER, GML_ID_ATTR, LOD0_ROOF_EDGE, POS_LIST,
        STRING_ATTRIBUTE,
    };
    use std::collections::BTreeMap;

    fn map(entries: Vec<(&str, GenericNode)>) -> GenericNode {
        GenericNode::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn city_doc(id: &str, pos_list: &str) -> GenericNode {
        let ring = map(vec![(POS_LIST, GenericNode::text(pos_list))]);
        let building = map(vec![
            (GML_ID_ATTR, GenericNode::text(id)),
            (LOD0_ROOF_EDGE, map(vec![("gml:LinearRing", ring)])),
        ]);
        map(vec![(
            CITY_MODEL,
            map(vec![(
                CITY_OBJECT_MEMBER,
                GenericNode::List(vec![map(vec![(BUILDING, building)])]),
            )]),
        )])
    }

    fn config() -> LinkConfig {
        LinkConfig {
            primary_field: POS_LIST.to_string(),
            secondary_field: "coordinates".to_string(),
            attributes: vec![AttributeMapping {
                source: "name".to_string(),
                name: "shopName".to_string(),
            }],
            csv_columns: Vec::new(),
            numeric_range_keys: false,
        }
    }

    #[test]
    fn links_point_record_into_footprint() {
        // 12 tokens: triples with elevation, dropped before pairing.
        let primary = city_doc("bldg_1", "0 0 1 0 10 1 10 10 1 10 0 1");
        let secondary = map(vec![(
            "shops",
            GenericNode::List(vec![map(vec![
                ("name", GenericNode::text("Cafe")),
                ("coordinates", GenericNode::text("5 5")),
            ])]),
        )]);

        let merged = run_linkage(&primary, &secondary, &config()).unwrap();

        let members = city_object_members(&merged);
        let attrs = members[0]
            .get(BUILDING)
            .and_then(|b| b.get(STRING_ATTRIBUTE))
            .and_then(GenericNode::as_list)
            .expect("merged building should carry attributes");
        assert_eq!(attrs.len(), 1);
        assert_eq!(
            attrs[0].get("@_name").and_then(GenericNode::inline_text),
            Some("shopName")
        );
        assert_eq!(
            attrs[0].get("gen:value").and_then(GenericNode::inline_text),
            Some("Cafe")
        );
    }

    #[test]
    fn range_mode_matches_scalar_membership() {
        let building = map(vec![
            (GML_ID_ATTR, GenericNode::text("bldg_1")),
            ("uro:buildingStoreys", GenericNode::text("1 5")),
        ]);
        let primary = map(vec![(
            CITY_MODEL,
            map(vec![(
                CITY_OBJECT_MEMBER,
                GenericNode::List(vec![map(vec![(BUILDING, building)])]),
            )]),
        )]);
        let secondary = map(vec![(
            "records",
            GenericNode::List(vec![map(vec![
                ("name", GenericNode::text("Mid rise")),
                ("storeys", GenericNode::text("3")),
            ])]),
        )]);

        let mut cfg = config();
        cfg.primary_field = "uro:buildingStoreys".to_string();
        cfg.secondary_field = "storeys".to_string();
        cfg.numeric_range_keys = true;

        let merged = run_linkage(&primary, &secondary, &cfg).unwrap();
        let attrs = city_object_members(&merged)[0]
            .get(BUILDING)
            .and_then(|b| b.get(STRING_ATTRIBUTE))
            .and_then(GenericNode::as_list)
            .expect("building should gain an attribute");
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn unlinkable_inputs_fail_before_merge() {
        let primary = city_doc("bldg_1", "0 0 1 0 10 1 10 10 1 10 0 1");
        let secondary = map(vec![("unrelated", GenericNode::text("x"))]);
        let err = run_linkage(&primary, &secondary, &config()).unwrap_err();
        assert!(err.to_string().contains("no building could be linked"));
    }

    #[test]
    fn document_without_members_is_rejected() {
        let primary = map(vec![(CITY_MODEL, map(vec![]))]);
        let secondary = map(vec![]);
        assert!(run_linkage(&primary, &secondary, &config()).is_err());
    }
}

//! Pairing primary buildings against secondary records.
//!
//! Each primary entry is compared against every secondary entry: scalar
//! keys by equality, range keys by inclusive membership, footprint
//! polygons by the crossing-number point-in-polygon test. The join is
//! many-to-many; pair order is not significant. Comparisons share no
//! mutable state, so the fan-out runs on the rayon pool.

use geo_types::Coord;
use rayon::prelude::*;

use crate::document::GenericNode;
use crate::extract::{BuildingKey, SecondaryKey};
use crate::keys::JoinKey;

/// A building identifier paired with the secondary record matched to it.
#[derive(Debug, Clone)]
pub struct MatchedPair {
    pub building_id: String,
    pub record: GenericNode,
}

/// Cross-joins primary and secondary keys into matched pairs.
///
/// Returns empty (after logging) when no primary entry carries both a key
/// and a building identifier, or when the secondary side is empty; the
/// caller surfaces an empty result as "no linkage possible".
pub fn match_pairs(primary: &[BuildingKey], secondary: &[SecondaryKey]) -> Vec<MatchedPair> {
    if primary
        .iter()
        .all(|entry| entry.key.is_none() || entry.building_id.is_none())
    {
        tracing::warn!("Matcher: every primary entry is missing its key or building id");
        return Vec::new();
    }
    if secondary.is_empty() {
        tracing::warn!("Matcher: no secondary records carry a join key");
        return Vec::new();
    }

    primary
        .par_iter()
        .filter_map(|entry| match (&entry.key, &entry.building_id) {
            (Some(key), Some(id)) => Some((key, id)),
            _ => None,
        })
        .flat_map_iter(|(key, id)| {
            secondary
                .iter()
                .filter(move |candidate| key_matches(key, &candidate.key))
                .map(|candidate| MatchedPair {
                    building_id: id.clone(),
                    record: candidate.record.clone(),
                })
        })
        .collect()
}

/// Whether a secondary key qualifies against a primary key.
pub fn key_matches(primary: &JoinKey, secondary: &JoinKey) -> bool {
    match primary {
        JoinKey::Polygon(polygon) => secondary
            .as_point()
            .is_some_and(|point| point_in_polygon(point, polygon)),
        JoinKey::Range { min, max } => secondary
            .first_number()
            .is_some_and(|value| value >= *min && value <= *max),
        JoinKey::Number(value) => secondary.first_number() == Some(*value),
        JoinKey::Numbers(values) => {
            values.first().copied().is_some_and(|first| secondary.first_number() == Some(first))
        }
        JoinKey::Text(value) => scalar_equals(value, secondary),
        JoinKey::Tokens(tokens) => tokens
            .first()
            .is_some_and(|first| scalar_equals(first, secondary)),
        // A single point cannot contain anything.
        JoinKey::Point(_) => false,
    }
}

/// Compares a primary scalar against the secondary key's first token,
/// numerically when both sides parse as numbers.
fn scalar_equals(primary: &str, secondary: &JoinKey) -> bool {
    if let Ok(value) = primary.trim().parse::<f64>()
        && let Some(candidate) = secondary.first_number()
    {
        return candidate == value;
    }
    secondary.first_token() == Some(primary)
}

/// Even-odd ray-casting membership test: the point is inside iff an odd
/// number of polygon edges cross a horizontal ray cast from it.
pub fn point_in_polygon(point: Coord<f64>, polygon: &[Coord<f64>]) -> bool {
    if polygon.is_empty() {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = (polygon[i].x, polygon[i].y);
        let (xj, yj) = (polygon[j].x, polygon[j].y);
        let crosses = (yi > point.y) != (yj > point.y)
            && point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

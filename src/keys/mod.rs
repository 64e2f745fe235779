//! Join keys and numeric parsing.
//!
//! All the numeric heuristics the traversals rely on live here: token
//! splitting, the coordinate-triple rule (counts divisible by 3 carry an
//! elevation that is dropped before pairing), quote stripping, and the
//! fully-numeric-string test. Two deliberately distinct policies exist:
//! `parse_coordinate_list` applies the triple rule and pairs the rest,
//! while `parse_numeric_tokens` keeps every token as a raw number.

use geo_types::Coord;

/// A normalized join key derived from a field value.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinKey {
    /// A single number.
    Number(f64),
    /// A list of raw numbers (no coordinate pairing applied).
    Numbers(Vec<f64>),
    /// An inclusive numeric range.
    Range { min: f64, max: f64 },
    /// A single 2-D coordinate.
    Point(Coord<f64>),
    /// A ring of 2-D coordinates (building footprint).
    Polygon(Vec<Coord<f64>>),
    /// A raw scalar string.
    Text(String),
    /// Raw string tokens split on comma/space.
    Tokens(Vec<String>),
}

impl JoinKey {
    /// The key's leading numeric value, parsing string tokens if needed.
    pub fn first_number(&self) -> Option<f64> {
        match self {
            JoinKey::Number(value) => Some(*value),
            JoinKey::Numbers(values) => values.first().copied(),
            JoinKey::Text(value) => value.trim().parse().ok(),
            JoinKey::Tokens(tokens) => tokens.first()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// The key's leading string token.
    pub fn first_token(&self) -> Option<&str> {
        match self {
            JoinKey::Text(value) => Some(value),
            JoinKey::Tokens(tokens) => tokens.first().map(String::as_str),
            _ => None,
        }
    }

    /// The key interpreted as a single 2-D point, when it carries one.
    pub fn as_point(&self) -> Option<Coord<f64>> {
        match self {
            JoinKey::Point(coord) => Some(*coord),
            JoinKey::Numbers(values) if values.len() >= 2 => Some(Coord {
                x: values[0],
                y: values[1],
            }),
            _ => None,
        }
    }
}

/// Splits on runs of whitespace/commas and parses each token as a float.
/// Unparseable tokens are skipped.
pub fn split_numeric_tokens(value: &str) -> Vec<f64> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse().ok())
        .collect()
}

/// True when the string is a separated list of two or more unsigned
/// decimal numbers, e.g. `"139.74, 35.65"`.
pub fn is_numeric_list(value: &str) -> bool {
    let tokens: Vec<&str> = value
        .split([',', ' '])
        .filter(|token| !token.is_empty())
        .collect();
    tokens.len() >= 2 && tokens.iter().all(|token| is_unsigned_decimal(token))
}

fn is_unsigned_decimal(token: &str) -> bool {
    let mut parts = token.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match parts.next() {
        Some(frac) => !frac.is_empty() && frac.chars().all(|c| c.is_ascii_digit()),
        None => true,
    }
}

/// Drops every third value when the count is divisible by 3 (coordinate
/// triples carry an elevation) and pairs the rest into 2-D coordinates.
/// A dangling unpaired final value is dropped.
pub fn pair_coordinates(values: &[f64]) -> Vec<Coord<f64>> {
    let flattened: Vec<f64> = if !values.is_empty() && values.len() % 3 == 0 {
        values
            .iter()
            .enumerate()
            .filter(|(i, _)| (i + 1) % 3 != 0)
            .map(|(_, v)| *v)
            .collect()
    } else {
        values.to_vec()
    };

    flattened
        .chunks_exact(2)
        .map(|pair| Coord {
            x: pair[0],
            y: pair[1],
        })
        .collect()
}

/// Parses a coordinate string into 2-D pairs via the triple rule.
pub fn parse_coordinate_list(value: &str) -> Vec<Coord<f64>> {
    pair_coordinates(&split_numeric_tokens(value))
}

/// A coordinate-string key: a point for one pair, a polygon for more.
pub fn coordinate_key(value: &str) -> Option<JoinKey> {
    let coords = parse_coordinate_list(value);
    match coords.len() {
        0 => None,
        1 => Some(JoinKey::Point(coords[0])),
        _ => Some(JoinKey::Polygon(coords)),
    }
}

/// Raw numbers as a key: a scalar when there is exactly one.
pub fn numbers_key(values: Vec<f64>) -> Option<JoinKey> {
    match values.len() {
        0 => None,
        1 => Some(JoinKey::Number(values[0])),
        _ => Some(JoinKey::Numbers(values)),
    }
}

/// An inclusive min/max range over the values; `None` below two values.
pub fn range_key(values: &[f64]) -> Option<JoinKey> {
    if values.len() < 2 {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(JoinKey::Range { min, max })
}

/// Reduces a numeric-list primary key to its min/max range. The legacy
/// matching path keyed buildings by range membership instead of raw
/// values; the behavior is kept behind a config switch rather than
/// silently dropped. Non-numeric keys pass through unchanged.
pub fn apply_range_policy(key: JoinKey) -> JoinKey {
    match key {
        JoinKey::Text(text) if is_numeric_list(&text) => {
            range_key(&split_numeric_tokens(&text)).unwrap_or(JoinKey::Text(text))
        }
        other => other,
    }
}

/// Removes surrounding (and embedded) double quotes.
pub fn strip_quotes(value: &str) -> String {
    value.replace('"', "")
}

/// Splits a raw string on runs of commas/spaces into tokens.
pub fn tokenize(value: &str) -> Vec<String> {
    value
        .split([',', ' '])
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reorders a pair into latitude-first order when magnitudes indicate a
/// (longitude, latitude) input. An optional normalization step; the
/// matching path compares coordinates in document order and does not
/// apply it.
#[allow(dead_code)]
pub fn normalize_lon_lat(coord: Coord<f64>) -> Coord<f64> {
    if coord.x.abs() <= 180.0 && coord.y.abs() <= 90.0 {
        Coord {
            x: coord.y,
            y: coord.x,
        }
    } else {
        coord
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_counts_drop_elevation_before_pairing() {
        let coords = parse_coordinate_list("10 20 5 30 40 6");
        assert_eq!(
            coords,
            vec![Coord { x: 10.0, y: 20.0 }, Coord { x: 30.0, y: 40.0 }]
        );
    }

    #[test]
    fn dangling_value_is_dropped() {
        let coords = pair_coordinates(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            coords,
            vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 3.0, y: 4.0 }]
        );
    }

    #[test]
    fn non_triple_counts_pair_directly() {
        let coords = parse_coordinate_list("0 0 0 10 10 10 10 0");
        assert_eq!(coords.len(), 4);
        assert_eq!(coords[1], Coord { x: 0.0, y: 10.0 });
    }

    #[test]
    fn numeric_list_detection() {
        assert!(is_numeric_list("139.74, 35.65"));
        assert!(is_numeric_list("1 2 3"));
        assert!(!is_numeric_list("42"));
        assert!(!is_numeric_list("Cafe Nishi"));
        assert!(!is_numeric_list("-1, 2"));
    }

    #[test]
    fn numbers_key_collapses_singletons() {
        assert_eq!(numbers_key(vec![7.0]), Some(JoinKey::Number(7.0)));
        assert!(matches!(
            numbers_key(vec![7.0, 8.0]),
            Some(JoinKey::Numbers(_))
        ));
        assert_eq!(numbers_key(Vec::new()), None);
    }

    #[test]
    fn range_key_needs_two_values() {
        assert_eq!(range_key(&[5.0]), None);
        assert_eq!(
            range_key(&[5.0, 1.0, 3.0]),
            Some(JoinKey::Range { min: 1.0, max: 5.0 })
        );
    }

    #[test]
    fn range_policy_converts_numeric_lists_only() {
        assert_eq!(
            apply_range_policy(JoinKey::Text("1 5 3".into())),
            JoinKey::Range { min: 1.0, max: 5.0 }
        );
        assert_eq!(
            apply_range_policy(JoinKey::Text("Minato".into())),
            JoinKey::Text("Minato".into())
        );
    }

    #[test]
    fn strip_quotes_and_tokenize() {
        assert_eq!(strip_quotes("\"a, b\""), "a, b");
        assert_eq!(tokenize("a, b  c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn normalize_swaps_lon_lat_pairs() {
        let swapped = normalize_lon_lat(Coord { x: 139.7, y: 35.6 });
        assert_eq!(swapped, Coord { x: 35.6, y: 139.7 });
        let kept = normalize_lon_lat(Coord { x: 500.0, y: 600.0 });
        assert_eq!(kept, Coord { x: 500.0, y: 600.0 });
    }

    #[test]
    fn first_number_parses_tokens() {
        assert_eq!(JoinKey::Text("12.5".into()).first_number(), Some(12.5));
        assert_eq!(
            JoinKey::Tokens(vec!["7".into(), "x".into()]).first_number(),
            Some(7.0)
        );
        assert_eq!(JoinKey::Text("tower".into()).first_number(), None);
    }
}

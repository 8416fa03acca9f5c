// Map centers for territories and their aggregates.
//
// Geometry comes in as a JSON table of code -> polygon rings ([lon, lat]
// vertex lists). An area's center is the centroid of the union of its
// members' polygons; since territory borders do not overlap, that is the
// area-weighted combination of the member polygons, not the average of
// their centroids. Averaging centroids would park widely spread areas in
// open ocean.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;

/// Per-code polygon geometry: one or more rings of [lon, lat] vertices.
pub type GeometryTable = HashMap<String, Vec<Vec<[f64; 2]>>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}

pub fn parse_geometries(json: &str) -> Result<GeometryTable, Box<dyn Error>> {
    let table: GeometryTable = serde_json::from_str(json)?;
    Ok(table)
}

/// Signed area and centroid of one ring, by the shoelace formula.
///
/// Returns `None` for degenerate rings (fewer than three vertices or zero
/// enclosed area).
fn ring_centroid(ring: &[[f64; 2]]) -> Option<(f64, Centroid)> {
    if ring.len() < 3 {
        return None;
    }
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let [x0, y0] = ring[i];
        let [x1, y1] = ring[(i + 1) % ring.len()];
        let cross = x0 * y1 - x1 * y0;
        twice_area += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    if twice_area.abs() < f64::EPSILON {
        return None;
    }
    let area = twice_area / 2.0;
    Some((
        area.abs(),
        Centroid { lon: cx / (3.0 * twice_area), lat: cy / (3.0 * twice_area) },
    ))
}

/// Centroid of the union of the polygons of `codes`.
///
/// Codes without geometry are skipped; a single-member area yields exactly
/// that member's own centroid. `None` when no member has usable geometry.
pub fn area_centroid(codes: &[String], geometries: &GeometryTable) -> Option<Centroid> {
    let mut total_area = 0.0;
    let mut lon_sum = 0.0;
    let mut lat_sum = 0.0;
    for code in codes {
        let Some(rings) = geometries.get(code) else {
            continue;
        };
        for ring in rings {
            if let Some((area, c)) = ring_centroid(ring) {
                total_area += area;
                lon_sum += c.lon * area;
                lat_sum += c.lat * area;
            }
        }
    }
    if total_area <= 0.0 {
        return None;
    }
    Some(Centroid { lat: lat_sum / total_area, lon: lon_sum / total_area })
}

/// Centroid of one territory's own geometry.
pub fn territory_centroid(code: &str, geometries: &GeometryTable) -> Option<Centroid> {
    area_centroid(std::slice::from_ref(&code.to_string()), geometries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Vec<[f64; 2]> {
        vec![[x, y], [x + side, y], [x + side, y + side], [x, y + side]]
    }

    fn table(entries: &[(&str, Vec<Vec<[f64; 2]>>)]) -> GeometryTable {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn square_centroid_is_its_center() {
        let geo = table(&[("AAA", vec![square(0.0, 0.0, 2.0)])]);
        let c = territory_centroid("AAA", &geo).unwrap();
        assert!((c.lon - 1.0).abs() < 1e-12);
        assert!((c.lat - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_member_area_equals_member_centroid() {
        let geo = table(&[("AAA", vec![square(10.0, -5.0, 3.0)])]);
        let member = territory_centroid("AAA", &geo).unwrap();
        let area = area_centroid(&["AAA".to_string()], &geo).unwrap();
        assert_eq!(area, member);
    }

    #[test]
    fn union_centroid_is_area_weighted() {
        // A unit square at the origin and a 3x3 square far away: the union
        // centroid must sit much closer to the big square, unlike a plain
        // average of the two centroids.
        let geo = table(&[
            ("SML", vec![square(0.0, 0.0, 1.0)]),
            ("BIG", vec![square(10.0, 0.0, 3.0)]),
        ]);
        let c = area_centroid(&["SML".to_string(), "BIG".to_string()], &geo).unwrap();
        let expected_lon = (0.5 * 1.0 + 11.5 * 9.0) / 10.0;
        let expected_lat = (0.5 * 1.0 + 1.5 * 9.0) / 10.0;
        assert!((c.lon - expected_lon).abs() < 1e-12);
        assert!((c.lat - expected_lat).abs() < 1e-12);
    }

    #[test]
    fn winding_direction_does_not_matter() {
        let mut reversed = square(0.0, 0.0, 2.0);
        reversed.reverse();
        let geo = table(&[("CW", vec![reversed]), ("CCW", vec![square(0.0, 0.0, 2.0)])]);
        assert_eq!(
            territory_centroid("CW", &geo).unwrap(),
            territory_centroid("CCW", &geo).unwrap()
        );
    }

    #[test]
    fn unknown_and_degenerate_members_are_skipped() {
        let geo = table(&[
            ("AAA", vec![square(0.0, 0.0, 2.0)]),
            ("BAD", vec![vec![[0.0, 0.0], [1.0, 1.0]]]),
        ]);
        let c = area_centroid(
            &["AAA".to_string(), "BAD".to_string(), "ZZZ".to_string()],
            &geo,
        )
        .unwrap();
        assert!((c.lon - 1.0).abs() < 1e-12);
        assert_eq!(area_centroid(&["ZZZ".to_string()], &geo), None);
        assert_eq!(area_centroid(&[], &geo), None);
    }

    #[test]
    fn parses_geometry_json() {
        let json = r#"{"AAA": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]]}"#;
        let geo = parse_geometries(json).unwrap();
        assert!((territory_centroid("AAA", &geo).unwrap().lat - 1.0).abs() < 1e-12);
    }
}

// Conversion between GeoFeature payloads and geo-types geometries
use geo_types::{Coord, LineString, MultiPolygon, Point, Polygon};

use crate::error::{PipelineError, Result};
use crate::models::{FeatureGeometry, GeoFeature, PolygonRings, Position, Ring};

// GeoJSON linear rings: three corners plus the closing position
const MIN_RING_POSITIONS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalGeometry {
    Point(Point<f64>),
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl CanonicalGeometry {
    /// Areal view of the geometry, `None` for points.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self {
            CanonicalGeometry::Point(_) => None,
            CanonicalGeometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon.clone()])),
            CanonicalGeometry::MultiPolygon(multi) => Some(multi.clone()),
        }
    }
}

fn malformed(feature_id: &str, reason: impl Into<String>) -> PipelineError {
    PipelineError::MalformedGeometry {
        feature_id: feature_id.to_string(),
        reason: reason.into(),
    }
}

fn to_coord(feature_id: &str, position: &Position) -> Result<Coord<f64>> {
    let [x, y] = *position;
    if !x.is_finite() || !y.is_finite() {
        return Err(malformed(feature_id, format!("non-finite position [{}, {}]", x, y)));
    }
    Ok(Coord { x, y })
}

fn ring_to_line_string(feature_id: &str, ring: &Ring) -> Result<LineString<f64>> {
    // Open rings are closed by Polygon::new, so count the closing position too
    let is_open = ring.first() != ring.last();
    let closed_len = ring.len() + usize::from(is_open);
    if closed_len < MIN_RING_POSITIONS {
        return Err(malformed(
            feature_id,
            format!("ring has {} positions, at least {} required", closed_len, MIN_RING_POSITIONS),
        ));
    }
    let coords = ring
        .iter()
        .map(|position| to_coord(feature_id, position))
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::new(coords))
}

fn rings_to_polygon(feature_id: &str, rings: &PolygonRings) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| malformed(feature_id, "polygon without rings"))?;
    let exterior = ring_to_line_string(feature_id, exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| ring_to_line_string(feature_id, ring))
        .collect::<Result<Vec<_>>>()?;
    // Polygon::new closes any ring left open
    Ok(Polygon::new(exterior, interiors))
}

/// Turn a feature payload into a canonical geometry.
pub fn adapt(feature: &GeoFeature) -> Result<CanonicalGeometry> {
    match &feature.geometry {
        FeatureGeometry::Point(position) => {
            to_coord(&feature.id, position).map(|coord| CanonicalGeometry::Point(Point::from(coord)))
        }
        FeatureGeometry::Polygon(rings) => {
            rings_to_polygon(&feature.id, rings).map(CanonicalGeometry::Polygon)
        }
        // An empty member list is the zero-area residual of a subtraction
        FeatureGeometry::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| rings_to_polygon(&feature.id, rings))
            .collect::<Result<Vec<_>>>()
            .map(|members| CanonicalGeometry::MultiPolygon(MultiPolygon::new(members))),
        FeatureGeometry::Unsupported { kind, .. } => {
            Err(PipelineError::UnsupportedGeometryType(kind.clone()))
        }
    }
}

fn line_string_to_ring(line_string: &LineString<f64>) -> Ring {
    line_string.coords().map(|c| [c.x, c.y]).collect()
}

fn polygon_to_rings(polygon: &Polygon<f64>) -> PolygonRings {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_string_to_ring)
        .collect()
}

/// Areal result back to a feature payload: one member is a Polygon, anything
/// else (including the empty residual) a MultiPolygon.
pub fn to_feature_geometry(multi: &MultiPolygon<f64>) -> FeatureGeometry {
    match multi.0.as_slice() {
        [single] => FeatureGeometry::Polygon(polygon_to_rings(single)),
        members => FeatureGeometry::MultiPolygon(members.iter().map(polygon_to_rings).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn square(x: f64, y: f64, size: f64) -> PolygonRings {
        vec![vec![
            [x, y],
            [x + size, y],
            [x + size, y + size],
            [x, y + size],
            [x, y],
        ]]
    }

    #[test]
    fn point_becomes_point() {
        let feature = GeoFeature::new("p", "Poço", FeatureGeometry::Point([-63.9, -8.7]));
        assert_eq!(
            adapt(&feature).unwrap(),
            CanonicalGeometry::Point(Point::new(-63.9, -8.7))
        );
    }

    #[test]
    fn polygon_keeps_holes() {
        let mut rings = square(0.0, 0.0, 10.0);
        rings.extend(square(2.0, 2.0, 2.0));
        let feature = GeoFeature::new("a", "Área", FeatureGeometry::Polygon(rings));

        match adapt(&feature).unwrap() {
            CanonicalGeometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0.len(), 5);
                assert_eq!(polygon.interiors().len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn multipolygon_keeps_members() {
        let feature = GeoFeature::new(
            "m",
            "Glebas",
            FeatureGeometry::MultiPolygon(vec![square(0.0, 0.0, 1.0), square(5.0, 5.0, 1.0)]),
        );
        match adapt(&feature).unwrap() {
            CanonicalGeometry::MultiPolygon(multi) => assert_eq!(multi.0.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unsupported_tag_is_rejected() {
        let feature = GeoFeature::new(
            "x",
            "Linha",
            FeatureGeometry::Unsupported {
                kind: "Unsupported".to_string(),
                coordinates: Value::Null,
            },
        );
        assert_eq!(
            adapt(&feature),
            Err(PipelineError::UnsupportedGeometryType("Unsupported".to_string()))
        );
    }

    #[test]
    fn short_rings_and_nan_are_malformed() {
        let short = GeoFeature::new(
            "s",
            "Curto",
            FeatureGeometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]),
        );
        assert!(matches!(adapt(&short), Err(PipelineError::MalformedGeometry { .. })));

        let nan = GeoFeature::new("n", "NaN", FeatureGeometry::Point([f64::NAN, 0.0]));
        assert!(matches!(adapt(&nan), Err(PipelineError::MalformedGeometry { .. })));
    }

    #[test]
    fn open_triangle_is_closed_not_rejected() {
        let open = GeoFeature::new(
            "t",
            "Triângulo",
            FeatureGeometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]]),
        );
        match adapt(&open).unwrap() {
            CanonicalGeometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0.len(), 4);
                assert!(polygon.exterior().is_closed());
            }
            other => panic!("unexpected {:?}", other),
        }

        let segment = GeoFeature::new(
            "s",
            "Segmento",
            FeatureGeometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0]]]),
        );
        assert!(matches!(adapt(&segment), Err(PipelineError::MalformedGeometry { .. })));
    }

    #[test]
    fn empty_multipolygon_is_an_empty_area() {
        let empty = GeoFeature::new("e", "Vazio", FeatureGeometry::MultiPolygon(vec![]));
        assert_eq!(
            adapt(&empty).unwrap(),
            CanonicalGeometry::MultiPolygon(MultiPolygon::new(vec![]))
        );
    }

    #[test]
    fn single_member_goes_back_as_polygon() {
        let feature = GeoFeature::new("a", "Área", FeatureGeometry::Polygon(square(0.0, 0.0, 1.0)));
        let multi = adapt(&feature).unwrap().to_multi_polygon().unwrap();

        assert_eq!(to_feature_geometry(&multi), feature.geometry);
        assert_eq!(
            to_feature_geometry(&MultiPolygon::new(vec![])),
            FeatureGeometry::MultiPolygon(vec![])
        );
    }
}

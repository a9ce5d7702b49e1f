// Fixture builders shared by the unit tests
use geo::Coord;
use serde_json::Value;

use crate::models::{FeatureGeometry, GeoFeature, GeoLayer};
use crate::projection::LocalProjection;

// Porto Velho area, where the licensing data lives
pub const ORIGIN: Coord<f64> = Coord { x: -63.85, y: -8.75 };

/// Axis-aligned square of `side_m` metres centred `offset_m` metres from ORIGIN.
pub fn square_at(id: &str, offset_m: (f64, f64), side_m: f64) -> GeoFeature {
    let projection = LocalProjection::new(ORIGIN).unwrap();
    let half = side_m / 2000.0;
    let (cx, cy) = (offset_m.0 / 1000.0, offset_m.1 / 1000.0);
    let corners = [(-half, -half), (half, -half), (half, half), (-half, half), (-half, -half)];
    let ring = corners
        .iter()
        .map(|(dx, dy)| {
            let c = projection.inverse(Coord { x: cx + dx, y: cy + dy });
            [c.x, c.y]
        })
        .collect();
    GeoFeature::new(id, format!("Área {}", id), FeatureGeometry::Polygon(vec![ring]))
}

pub fn square(id: &str, side_m: f64) -> GeoFeature {
    square_at(id, (0.0, 0.0), side_m)
}

pub fn point(id: &str) -> GeoFeature {
    GeoFeature::new(id, format!("Ponto {}", id), FeatureGeometry::Point([ORIGIN.x, ORIGIN.y]))
}

pub fn unsupported(id: &str) -> GeoFeature {
    GeoFeature::new(
        id,
        format!("Linha {}", id),
        FeatureGeometry::Unsupported {
            kind: "Unsupported".to_string(),
            coordinates: Value::Null,
        },
    )
}

pub fn layer(id: &str, features: Vec<GeoFeature>) -> GeoLayer {
    let features = features.into_iter().map(|f| f.in_layer(id)).collect();
    GeoLayer::new(id, format!("Camada {}", id), features)
}

/// One MultiPolygon feature made of the given squares.
pub fn multi_square(id: &str, parts: &[((f64, f64), f64)]) -> GeoFeature {
    let members = parts
        .iter()
        .map(|&(offset_m, side_m)| match square_at(id, offset_m, side_m).geometry {
            FeatureGeometry::Polygon(rings) => rings,
            _ => unreachable!(),
        })
        .collect();
    GeoFeature::new(id, format!("Área {}", id), FeatureGeometry::MultiPolygon(members))
}

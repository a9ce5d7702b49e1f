// Area and perimeter reporting for any layer
use geo::{Area, LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::Result;
use crate::geometry_adapter::{adapt, CanonicalGeometry};
use crate::models::{GeoFeature, GeoLayer};
use crate::pipeline::GeoPipeline;
use crate::projection::LocalProjection;

pub const SQUARE_METERS_PER_HECTARE: f64 = 10_000.0;
const SQUARE_METERS_PER_SQUARE_KM: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMetrics {
    pub id: String,
    pub name: String,
    pub area_m2: f64,
    pub area_ha: f64,
    pub perimetro_km: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetrics {
    pub features: Vec<FeatureMetrics>,
    pub total_area_m2: f64,
    pub total_area_ha: f64,
    pub total_perimetro_km: f64,
}

impl LayerMetrics {
    /// Share of the layer total, in percent. `None` when the layer has no area.
    pub fn percentage_of_total(&self, feature: &FeatureMetrics) -> Option<f64> {
        if self.total_area_ha > 0.0 {
            Some(feature.area_ha / self.total_area_ha * 100.0)
        } else {
            None
        }
    }

    pub fn average_area_ha(&self) -> Option<f64> {
        if self.features.is_empty() {
            None
        } else {
            Some(self.total_area_ha / self.features.len() as f64)
        }
    }
}

fn ring_length_km(ring: &LineString<f64>) -> f64 {
    ring.lines().map(|line| line.dx().hypot(line.dy())).sum()
}

fn measure_areal(multi: &MultiPolygon<f64>) -> Result<(f64, f64)> {
    if multi.0.is_empty() {
        return Ok((0.0, 0.0));
    }
    let projection = LocalProjection::centered_on(multi)?;
    let planar = projection.project(multi);
    let area_m2 = planar.unsigned_area() * SQUARE_METERS_PER_SQUARE_KM;
    let perimeter_km = planar
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(ring_length_km)
        .sum();
    Ok((area_m2, perimeter_km))
}

/// Area in m² and perimeter in km. Points measure zero.
pub fn measure_geometry(geometry: &CanonicalGeometry) -> Result<(f64, f64)> {
    match geometry.to_multi_polygon() {
        Some(multi) => measure_areal(&multi),
        None => Ok((0.0, 0.0)),
    }
}

pub fn measure_feature(feature: &GeoFeature) -> Result<(f64, f64)> {
    measure_geometry(&adapt(feature)?)
}

impl<S: DiagnosticSink> GeoPipeline<S> {
    /// Per-feature and total area/perimeter. Never fails: features that cannot
    /// be measured are listed with zeros and reported to the sink.
    pub fn compute_metrics(&self, layer: &GeoLayer) -> LayerMetrics {
        let features: Vec<FeatureMetrics> = layer
            .features
            .iter()
            .map(|feature| {
                let (area_m2, perimetro_km) = measure_feature(feature).unwrap_or_else(|err| {
                    self.emit(
                        Diagnostic::warn(
                            DiagnosticKind::MetricsFeatureSkipped,
                            format!("measured as zero: {}", err),
                        )
                        .for_layer(&layer.id)
                        .for_feature(&feature.id),
                    );
                    (0.0, 0.0)
                });
                FeatureMetrics {
                    id: feature.id.clone(),
                    name: feature.name.clone(),
                    area_m2,
                    area_ha: area_m2 / SQUARE_METERS_PER_HECTARE,
                    perimetro_km,
                }
            })
            .collect();

        // fold from +0.0 so an empty layer reports 0, not -0
        let total = |value: fn(&FeatureMetrics) -> f64| {
            features.iter().map(value).fold(0.0, |acc, v| acc + v)
        };
        LayerMetrics {
            total_area_m2: total(|f| f.area_m2),
            total_area_ha: total(|f| f.area_ha),
            total_perimetro_km: total(|f| f.perimetro_km),
            features,
        }
    }
}

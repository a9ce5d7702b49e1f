// Carving reference areas out of base features
use geo::{BooleanOps, MultiPolygon};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{PipelineError, Result};
use crate::geometry_adapter::{adapt, to_feature_geometry, CanonicalGeometry};
use crate::models::{GeoFeature, GeoLayer};
use crate::pipeline::{ensure_has_features, GeoPipeline};

/// A reference feature, adapted once and reused for every base feature.
#[derive(Debug, Clone)]
enum PreparedReference {
    Area(MultiPolygon<f64>),
    // Points have no area to remove
    Point,
    Invalid(PipelineError),
}

struct Reference<'a> {
    id: &'a str,
    prepared: PreparedReference,
}

fn prepare_references(references: &[GeoFeature]) -> Vec<Reference<'_>> {
    references
        .iter()
        .map(|feature| {
            let prepared = match adapt(feature) {
                Ok(CanonicalGeometry::Point(_)) => PreparedReference::Point,
                Ok(areal) => areal
                    .to_multi_polygon()
                    .map(PreparedReference::Area)
                    .unwrap_or(PreparedReference::Point),
                Err(err) => PreparedReference::Invalid(err),
            };
            Reference {
                id: &feature.id,
                prepared,
            }
        })
        .collect()
}

/// One step of the subtraction fold. `None` means the reference is a no-op.
fn difference_step(
    running: &MultiPolygon<f64>,
    reference: &PreparedReference,
) -> Option<Result<MultiPolygon<f64>>> {
    match reference {
        PreparedReference::Point => None,
        PreparedReference::Invalid(err) => Some(Err(err.clone())),
        // Nothing left to carve
        PreparedReference::Area(_) if running.0.is_empty() => None,
        PreparedReference::Area(area) => Some(Ok(running.difference(area))),
    }
}

impl<S: DiagnosticSink> GeoPipeline<S> {
    /// Subtract every reference from `base`, left to right.
    pub fn subtract_feature(&self, base: &GeoFeature, references: &[GeoFeature]) -> Result<GeoFeature> {
        let prepared = prepare_references(references);
        self.subtract_prepared(base, &prepared)
    }

    fn subtract_prepared(&self, base: &GeoFeature, references: &[Reference<'_>]) -> Result<GeoFeature> {
        let base_area = match adapt(base)?.to_multi_polygon() {
            Some(area) => area,
            None => {
                self.emit(
                    Diagnostic::warn(
                        DiagnosticKind::PointBasePassthrough,
                        "point features cannot be subtracted from; kept as is",
                    )
                    .for_layer(&base.layer_id)
                    .for_feature(&base.id),
                );
                return Ok(base.clone());
            }
        };

        let residual = references.iter().fold(base_area, |running, reference| {
            match difference_step(&running, &reference.prepared) {
                None => running,
                Some(Ok(next)) => next,
                Some(Err(err)) => {
                    self.emit(
                        Diagnostic::warn(
                            DiagnosticKind::SubtractionStepFailed,
                            format!("reference '{}' not subtracted: {}", reference.id, err),
                        )
                        .for_layer(&base.layer_id)
                        .for_feature(&base.id),
                    );
                    running
                }
            }
        });

        let mut properties = base.properties.clone();
        properties.insert("subtracted".to_string(), Value::Bool(true));
        properties.insert("originalFeatureId".to_string(), Value::from(base.id.clone()));

        Ok(GeoFeature {
            id: format!("{}-subtracted", base.id),
            name: format!("{} (Subtraído)", base.name),
            geometry: to_feature_geometry(&residual),
            properties,
            layer_id: base.layer_id.clone(),
        })
    }

    /// Subtract the whole `reference` layer from each feature of `base`.
    ///
    /// A base feature that cannot be processed is kept unmodified, so the
    /// result always has as many features as `base`.
    pub fn subtract_layers(&self, base: &GeoLayer, reference: &GeoLayer) -> Result<GeoLayer> {
        ensure_has_features(base)?;
        ensure_has_features(reference)?;

        let prepared = prepare_references(&reference.features);
        let features: Vec<GeoFeature> = base
            .features
            .iter()
            .map(|feature| match self.subtract_prepared(feature, &prepared) {
                Ok(result) => result,
                Err(err) => {
                    self.emit(
                        Diagnostic::warn(
                            DiagnosticKind::BaseFeatureKept,
                            format!("kept without subtraction: {}", err),
                        )
                        .for_layer(&base.id)
                        .for_feature(&feature.id),
                    );
                    feature.clone()
                }
            })
            .collect();

        self.emit(
            Diagnostic::info(
                DiagnosticKind::LayersSubtracted,
                format!(
                    "subtracted {} reference features from {} base features",
                    reference.feature_count(),
                    features.len()
                ),
            )
            .for_layer(&base.id),
        );

        Ok(GeoLayer::derived(
            format!("{}-subtracted", base.id),
            format!("{} - Subtraído", base.name),
            features,
            &base.style(),
        ))
    }
}

// Buffer zones around features, built in the local tangent plane
use std::f64::consts::FRAC_PI_2;

use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin};
use geo::{CoordsIter, MultiPolygon, Point};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::{PipelineError, Result};
use crate::geometry_adapter::{adapt, to_feature_geometry, CanonicalGeometry};
use crate::models::{GeoFeature, GeoLayer};
use crate::pipeline::{ensure_buffer_distance, ensure_has_features, GeoPipeline};
use crate::projection::LocalProjection;

const MAX_LATITUDE: f64 = 90.0;

/// Round joins and caps with `quadrant_segments` arc steps per quarter turn.
pub fn buffer_style(distance_km: f64, quadrant_segments: usize) -> BufferStyle<f64> {
    let step = FRAC_PI_2 / quadrant_segments.max(1) as f64;
    BufferStyle::new(distance_km)
        .line_join(LineJoin::Round(step))
        .line_cap(LineCap::Round(step))
}

/// Buffer a canonical geometry by `distance_km`, returning lng/lat output.
///
/// The buffer is built in the local tangent plane of the geometry; a result
/// reaching past a pole has no lng/lat form and is rejected.
pub fn buffer_geometry(
    geometry: &CanonicalGeometry,
    distance_km: f64,
    quadrant_segments: usize,
) -> Result<MultiPolygon<f64>> {
    let style = buffer_style(distance_km, quadrant_segments);
    let (projection, planar) = match geometry {
        CanonicalGeometry::Point(point) => {
            let projection = LocalProjection::new(point.0)?;
            let centre = Point::new(0.0, 0.0);
            (projection, centre.buffer_with_style(style))
        }
        areal => {
            let multi = areal.to_multi_polygon().unwrap_or_else(|| MultiPolygon::new(vec![]));
            if multi.0.is_empty() {
                return Ok(multi);
            }
            let projection = LocalProjection::centered_on(&multi)?;
            let planar = projection.project(&multi).buffer_with_style(style);
            (projection, planar)
        }
    };

    let buffered = projection.unproject(&planar);
    if let Some(latitude) = buffered
        .coords_iter()
        .map(|coord| coord.y)
        .find(|lat| lat.abs() > MAX_LATITUDE)
    {
        return Err(PipelineError::DegenerateProjection { latitude });
    }
    Ok(buffered)
}

impl<S: DiagnosticSink> GeoPipeline<S> {
    /// Buffer a single feature by `distance_meters`.
    pub fn buffer_feature(&self, feature: &GeoFeature, distance_meters: f64) -> Result<GeoFeature> {
        ensure_buffer_distance(distance_meters)?;
        self.buffer_unchecked(feature, distance_meters)
    }

    fn buffer_unchecked(&self, feature: &GeoFeature, distance_meters: f64) -> Result<GeoFeature> {
        let geometry = adapt(feature)?;
        let buffered = buffer_geometry(
            &geometry,
            distance_meters / 1000.0,
            self.config().arc_segments(),
        )?;
        if buffered.0.is_empty() {
            return Err(PipelineError::EmptyBuffer {
                feature_id: feature.id.clone(),
            });
        }

        let mut properties = feature.properties.clone();
        properties.insert("bufferDistance".to_string(), Value::from(distance_meters));
        properties.insert("originalFeatureId".to_string(), Value::from(feature.id.clone()));
        properties.insert("originalFeatureName".to_string(), Value::from(feature.name.clone()));

        Ok(GeoFeature {
            id: format!("{}-buffer", feature.id),
            name: format!("{} (Buffer {}m)", feature.name, distance_meters),
            geometry: to_feature_geometry(&buffered),
            properties,
            layer_id: feature.layer_id.clone(),
        })
    }

    /// Buffer every feature of `layer`. Features that cannot be buffered are
    /// left out; the call fails only when none can.
    pub fn buffer_layer(&self, layer: &GeoLayer, distance_meters: f64) -> Result<GeoLayer> {
        ensure_has_features(layer)?;
        ensure_buffer_distance(distance_meters)?;

        let buffered: Vec<GeoFeature> = layer
            .features
            .iter()
            .filter_map(|feature| match self.buffer_unchecked(feature, distance_meters) {
                Ok(result) => Some(result),
                Err(err) => {
                    self.emit(
                        Diagnostic::warn(
                            DiagnosticKind::BufferFeatureSkipped,
                            format!("buffer skipped: {}", err),
                        )
                        .for_layer(&layer.id)
                        .for_feature(&feature.id),
                    );
                    None
                }
            })
            .collect();

        if buffered.is_empty() {
            return Err(PipelineError::NoBufferableFeatures {
                layer_id: layer.id.clone(),
            });
        }

        self.emit(
            Diagnostic::info(
                DiagnosticKind::LayerBuffered,
                format!(
                    "buffered {} of {} features at {}m",
                    buffered.len(),
                    layer.feature_count(),
                    distance_meters
                ),
            )
            .for_layer(&layer.id),
        );

        Ok(GeoLayer::derived(
            format!("{}-buffer", layer.id),
            format!("{} - Buffer {}m", layer.name, distance_meters),
            buffered,
            &self.config().buffer_style,
        ))
    }
}

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::Result;
use crate::models::GeoLayer;
use crate::pipeline::{ensure_buffer_distance, ensure_has_features, GeoPipeline};

impl<S: DiagnosticSink> GeoPipeline<S> {
    /// Zone of influence: buffer `base`, then carve `reference` out of it.
    ///
    /// Both layers and the distance are validated before either stage runs.
    /// Errors from either stage are returned as they are.
    pub fn buffer_then_subtract(
        &self,
        base: &GeoLayer,
        reference: &GeoLayer,
        distance_meters: f64,
    ) -> Result<GeoLayer> {
        ensure_has_features(base)?;
        ensure_has_features(reference)?;
        ensure_buffer_distance(distance_meters)?;

        let buffered = self.buffer_layer(base, distance_meters)?;
        let mut zone = self.subtract_layers(&buffered, reference)?;

        zone.name = format!(
            "Zona de Amortecimento - {} ({}m) - Subtraído",
            base.name, distance_meters
        );
        zone.apply_style(&self.config().zone_style);

        self.emit(
            Diagnostic::info(
                DiagnosticKind::ZoneComposed,
                format!(
                    "zone of {}m from {} base features minus {} reference features: {} features",
                    distance_meters,
                    base.feature_count(),
                    reference.feature_count(),
                    zone.feature_count()
                ),
            )
            .for_layer(&zone.id),
        );
        Ok(zone)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{LayerStyle, PipelineConfig};
    use crate::diagnostics::{DiagnosticKind, RecordingSink};
    use crate::error::PipelineError;
    use crate::metrics::measure_feature;
    use crate::pipeline::GeoPipeline;
    use crate::test_support::{layer, square, square_at, unsupported};

    fn pipeline() -> GeoPipeline<RecordingSink> {
        GeoPipeline::with_sink(PipelineConfig::default(), RecordingSink::new())
    }

    #[test]
    fn zone_is_the_buffer_ring_around_the_base() {
        let pipeline = pipeline();
        let base = layer("imoveis", vec![square("lote", 100.0)]);
        let zone = pipeline.buffer_then_subtract(&base, &base, 50.0).unwrap();

        assert_eq!(zone.id, "imoveis-buffer-subtracted");
        assert_eq!(zone.name, "Zona de Amortecimento - Camada imoveis (50m) - Subtraído");
        assert_eq!(zone.style(), LayerStyle::zone());
        assert_eq!(zone.feature_count(), 1);
        assert_eq!(zone.features[0].id, "lote-buffer-subtracted");

        let (ring_m2, _) = measure_feature(&zone.features[0]).unwrap();
        // 100m square grown by 50m is about 37 850 m², minus the square itself
        assert!(ring_m2 > 27_000.0 && ring_m2 < 27_900.0, "{}", ring_m2);
        assert_eq!(pipeline.sink().count(DiagnosticKind::ZoneComposed), 1);
    }

    #[test]
    fn zone_palette_differs_from_buffer_palette() {
        let base = layer("a", vec![square("1", 100.0)]);
        let reference = layer("b", vec![square_at("r", (500.0, 0.0), 10.0)]);
        let pipeline = pipeline();

        let buffer = pipeline.buffer_layer(&base, 20.0).unwrap();
        let zone = pipeline.buffer_then_subtract(&base, &reference, 20.0).unwrap();
        assert_ne!(buffer.style(), zone.style());
    }

    #[test]
    fn stage_errors_propagate_unchanged() {
        let base = layer("a", vec![unsupported("1")]);
        let reference = layer("b", vec![square("r", 10.0)]);
        assert_eq!(
            pipeline().buffer_then_subtract(&base, &reference, 20.0),
            Err(PipelineError::NoBufferableFeatures {
                layer_id: "a".to_string()
            })
        );

    }

    #[test]
    fn invalid_inputs_fail_before_any_buffering() {
        let good = layer("a", vec![square("1", 10.0)]);
        let empty = layer("b", vec![]);
        let reference = layer("r", vec![square("r", 10.0)]);

        for (base, reference, distance) in [
            (&good, &empty, 20.0),
            (&empty, &reference, 20.0),
            (&good, &reference, -1.0),
        ] {
            let pipeline = pipeline();
            let err = pipeline
                .buffer_then_subtract(base, reference, distance)
                .unwrap_err();
            assert!(err.is_validation());
            assert!(pipeline.sink().events().is_empty());
        }
    }
}

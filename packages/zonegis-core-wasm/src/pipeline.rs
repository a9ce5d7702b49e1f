use crate::config::PipelineConfig;
use crate::diagnostics::{ConsoleSink, Diagnostic, DiagnosticSink};
use crate::error::{Result, ValidationError};
use crate::models::GeoLayer;

/// Entry point for every layer operation.
///
/// Holds the configuration and the sink that receives per-feature
/// diagnostics. Operations never mutate their inputs and keep no state
/// between calls, so one pipeline can serve any number of requests.
pub struct GeoPipeline<S = ConsoleSink> {
    config: PipelineConfig,
    sink: S,
}

impl GeoPipeline<ConsoleSink> {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        GeoPipeline {
            config,
            sink: ConsoleSink,
        }
    }
}

impl Default for GeoPipeline<ConsoleSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DiagnosticSink> GeoPipeline<S> {
    pub fn with_sink(config: PipelineConfig, sink: S) -> Self {
        GeoPipeline { config, sink }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub(crate) fn emit(&self, diagnostic: Diagnostic) {
        self.sink.emit(diagnostic);
    }
}

pub(crate) fn ensure_has_features(layer: &GeoLayer) -> Result<()> {
    if layer.is_empty() {
        return Err(ValidationError::EmptyLayer {
            layer_id: layer.id.clone(),
        }
        .into());
    }
    Ok(())
}

pub(crate) fn ensure_buffer_distance(distance_meters: f64) -> Result<()> {
    if !distance_meters.is_finite() || distance_meters <= 0.0 {
        return Err(ValidationError::InvalidDistance(distance_meters).into());
    }
    Ok(())
}

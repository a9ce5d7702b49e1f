use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, Once};
use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
// Layer, feature and geometry payloads shared with the UI
pub mod models;
pub mod config;
pub mod error;
pub mod diagnostics;
pub mod geometry_adapter;
pub mod projection;
mod pipeline;
// Buffer zones around features
pub mod buffer;
// Subtraction of reference layers
pub mod difference;
mod layer_composer;
// Area / perimeter metrics and their display form
pub mod metrics;
pub mod format;
// GeoJSON, KML and CSV downloads
pub mod export;

#[cfg(test)]
mod test_support;

pub use config::{LayerStyle, PipelineConfig};
pub use diagnostics::{ConsoleSink, Diagnostic, DiagnosticKind, DiagnosticSink, NullSink, RecordingSink};
pub use error::{PipelineError, Result, ValidationError};
pub use metrics::{FeatureMetrics, LayerMetrics};
pub use models::{FeatureGeometry, GeoFeature, GeoLayer, LayerSource};
pub use pipeline::GeoPipeline;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

static INIT: Once = Once::new();

lazy_static! {
    // Configuration used by the exported JS functions
    static ref PIPELINE_CONFIG: Mutex<PipelineConfig> = Mutex::new(PipelineConfig::default());
}

#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("zonegis core initialized");
    });
}

fn current_config() -> PipelineConfig {
    PIPELINE_CONFIG
        .lock()
        .map(|config| config.clone())
        .unwrap_or_default()
}

fn js_pipeline() -> GeoPipeline {
    GeoPipeline::with_config(current_config())
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> std::result::Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

// Plain objects instead of JS Maps for the property bags
fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn to_js_error(err: PipelineError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

#[wasm_bindgen(js_name = setPipelineConfig)]
pub fn set_pipeline_config_js(config: JsValue) -> std::result::Result<(), JsValue> {
    let config: PipelineConfig = from_js(config, "pipeline config")?;
    let mut state = PIPELINE_CONFIG
        .lock()
        .map_err(|_| JsValue::from_str("Pipeline config is unavailable"))?;
    *state = config;
    Ok(())
}

#[wasm_bindgen(js_name = getPipelineConfig)]
pub fn get_pipeline_config_js() -> std::result::Result<JsValue, JsValue> {
    to_js(&current_config())
}

#[wasm_bindgen(js_name = bufferLayer)]
pub fn buffer_layer_js(layer: JsValue, distance_meters: f64) -> std::result::Result<JsValue, JsValue> {
    let layer: GeoLayer = from_js(layer, "layer")?;
    let buffered = js_pipeline()
        .buffer_layer(&layer, distance_meters)
        .map_err(to_js_error)?;
    to_js(&buffered)
}

#[wasm_bindgen(js_name = subtractLayers)]
pub fn subtract_layers_js(base: JsValue, reference: JsValue) -> std::result::Result<JsValue, JsValue> {
    let base: GeoLayer = from_js(base, "base layer")?;
    let reference: GeoLayer = from_js(reference, "reference layer")?;
    let subtracted = js_pipeline()
        .subtract_layers(&base, &reference)
        .map_err(to_js_error)?;
    to_js(&subtracted)
}

#[wasm_bindgen(js_name = bufferThenSubtract)]
pub fn buffer_then_subtract_js(
    base: JsValue,
    reference: JsValue,
    distance_meters: f64,
) -> std::result::Result<JsValue, JsValue> {
    let base: GeoLayer = from_js(base, "base layer")?;
    let reference: GeoLayer = from_js(reference, "reference layer")?;
    let zone = js_pipeline()
        .buffer_then_subtract(&base, &reference, distance_meters)
        .map_err(to_js_error)?;
    to_js(&zone)
}

#[wasm_bindgen(js_name = computeMetrics)]
pub fn compute_metrics_js(layer: JsValue) -> std::result::Result<JsValue, JsValue> {
    let layer: GeoLayer = from_js(layer, "layer")?;
    to_js(&js_pipeline().compute_metrics(&layer))
}

// Localized table for the metrics panel
#[wasm_bindgen(js_name = formatMetrics)]
pub fn format_metrics_js(metrics: JsValue) -> std::result::Result<JsValue, JsValue> {
    let metrics: LayerMetrics = from_js(metrics, "metrics")?;
    to_js(&metrics.summary())
}

#[wasm_bindgen(js_name = layerToFeatureCollection)]
pub fn layer_to_feature_collection_js(layer: JsValue) -> std::result::Result<JsValue, JsValue> {
    let layer: GeoLayer = from_js(layer, "layer")?;
    let collection = export::to_feature_collection(&layer).map_err(to_js_error)?;
    to_js(&collection)
}

#[wasm_bindgen(js_name = layerToKml)]
pub fn layer_to_kml_js(layer: JsValue) -> std::result::Result<String, JsValue> {
    let layer: GeoLayer = from_js(layer, "layer")?;
    export::to_kml(&layer).map_err(to_js_error)
}

#[wasm_bindgen(js_name = layerToCsv)]
pub fn layer_to_csv_js(layer: JsValue) -> std::result::Result<String, JsValue> {
    let layer: GeoLayer = from_js(layer, "layer")?;
    export::to_csv(&layer).map_err(to_js_error)
}

// File name stem for downloads of a layer
#[wasm_bindgen(js_name = exportFilename)]
pub fn export_filename_js(name: &str) -> String {
    export::sanitize_filename(name)
}

use serde::{Deserialize, Serialize};

/// Arc resolution used when approximating round buffer caps.
pub const DEFAULT_QUADRANT_SEGMENTS: usize = 16;

// Palette for plain buffer layers
pub const BUFFER_LAYER_COLOR: &str = "#F59E0B";
pub const BUFFER_LAYER_OPACITY: f64 = 0.35;

// Palette for buffer-minus-reference ("zona de amortecimento") layers
pub const ZONE_LAYER_COLOR: &str = "#8B5CF6";
pub const ZONE_LAYER_OPACITY: f64 = 0.45;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub color: String,
    pub opacity: f64,
}

impl LayerStyle {
    pub fn buffer() -> Self {
        LayerStyle {
            color: BUFFER_LAYER_COLOR.to_string(),
            opacity: BUFFER_LAYER_OPACITY,
        }
    }

    pub fn zone() -> Self {
        LayerStyle {
            color: ZONE_LAYER_COLOR.to_string(),
            opacity: ZONE_LAYER_OPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub quadrant_segments: usize,
    pub buffer_style: LayerStyle,
    pub zone_style: LayerStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
            buffer_style: LayerStyle::buffer(),
            zone_style: LayerStyle::zone(),
        }
    }
}

impl PipelineConfig {
    /// Segments per quarter turn, never below one.
    pub fn arc_segments(&self) -> usize {
        self.quadrant_segments.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "quadrantSegments": 8 }"#).unwrap();
        assert_eq!(config.quadrant_segments, 8);
        assert_eq!(config.buffer_style, LayerStyle::buffer());
        assert_eq!(config.zone_style, LayerStyle::zone());
    }

    #[test]
    fn palettes_are_distinct() {
        assert_ne!(LayerStyle::buffer(), LayerStyle::zone());
    }

    #[test]
    fn zero_segments_is_clamped() {
        let config = PipelineConfig {
            quadrant_segments: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.arc_segments(), 1);
    }
}

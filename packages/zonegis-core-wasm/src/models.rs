// Shared data structures exchanged with the licensing UI
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::LayerStyle;

/// `[lng, lat]` in WGS84 degrees.
pub type Position = [f64; 2];
/// Closed ring, first position repeated at the end.
pub type Ring = Vec<Position>;
/// Exterior ring followed by its holes.
pub type PolygonRings = Vec<Ring>;
pub type Properties = Map<String, Value>;

/// Geometry payload of a feature, keyed by the GeoJSON `type` tag.
///
/// `Unsupported` keeps foreign tags intact so the pipeline can reject them per
/// feature instead of failing the whole layer at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry", into = "RawGeometry")]
pub enum FeatureGeometry {
    Point(Position),
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
    Unsupported { kind: String, coordinates: Value },
}

impl FeatureGeometry {
    pub fn type_name(&self) -> &str {
        match self {
            FeatureGeometry::Point(_) => "Point",
            FeatureGeometry::Polygon(_) => "Polygon",
            FeatureGeometry::MultiPolygon(_) => "MultiPolygon",
            FeatureGeometry::Unsupported { kind, .. } => kind,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, FeatureGeometry::Point(_))
    }
}

// Wire form: the `type` + `coordinates` pair of a GeoFeature
#[derive(Serialize, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

fn to_position(values: Vec<f64>) -> Result<Position, String> {
    if values.len() < 2 {
        return Err(format!("position needs [lng, lat], got {} values", values.len()));
    }
    Ok([values[0], values[1]])
}

fn parse_position(value: Value) -> Result<Position, String> {
    let values: Vec<f64> = serde_json::from_value(value).map_err(|e| e.to_string())?;
    to_position(values)
}

fn parse_rings(value: Value) -> Result<PolygonRings, String> {
    let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(value).map_err(|e| e.to_string())?;
    rings
        .into_iter()
        .map(|ring| ring.into_iter().map(to_position).collect())
        .collect()
}

impl TryFrom<RawGeometry> for FeatureGeometry {
    type Error = String;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "Point" => parse_position(raw.coordinates)
                .map(FeatureGeometry::Point)
                .map_err(|e| format!("invalid Point coordinates: {}", e)),
            "Polygon" => parse_rings(raw.coordinates)
                .map(FeatureGeometry::Polygon)
                .map_err(|e| format!("invalid Polygon coordinates: {}", e)),
            "MultiPolygon" => {
                let polygons: Vec<Value> = serde_json::from_value(raw.coordinates)
                    .map_err(|e| format!("invalid MultiPolygon coordinates: {}", e))?;
                polygons
                    .into_iter()
                    .map(parse_rings)
                    .collect::<Result<Vec<_>, _>>()
                    .map(FeatureGeometry::MultiPolygon)
                    .map_err(|e| format!("invalid MultiPolygon coordinates: {}", e))
            }
            _ => Ok(FeatureGeometry::Unsupported {
                kind: raw.kind,
                coordinates: raw.coordinates,
            }),
        }
    }
}

impl From<FeatureGeometry> for RawGeometry {
    fn from(geometry: FeatureGeometry) -> Self {
        let kind = geometry.type_name().to_string();
        let coordinates = match geometry {
            FeatureGeometry::Point(position) => serde_json::to_value(position),
            FeatureGeometry::Polygon(rings) => serde_json::to_value(rings),
            FeatureGeometry::MultiPolygon(polygons) => serde_json::to_value(polygons),
            FeatureGeometry::Unsupported { coordinates, .. } => Ok(coordinates),
        };
        RawGeometry {
            kind,
            coordinates: coordinates.unwrap_or(Value::Null),
        }
    }
}

// `properties: null` is common in UI payloads
fn properties_or_empty<'de, D>(deserializer: D) -> Result<Properties, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoFeature {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub geometry: FeatureGeometry,
    #[serde(default, deserialize_with = "properties_or_empty")]
    pub properties: Properties,
    #[serde(default)]
    pub layer_id: String,
}

impl GeoFeature {
    pub fn new(id: impl Into<String>, name: impl Into<String>, geometry: FeatureGeometry) -> Self {
        GeoFeature {
            id: id.into(),
            name: name.into(),
            geometry,
            properties: Properties::new(),
            layer_id: String::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn in_layer(mut self, layer_id: impl Into<String>) -> Self {
        self.layer_id = layer_id.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerSource {
    #[default]
    System,
    Imported,
}

fn default_visible() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

/// A named, ordered collection of features as shown on the map.
///
/// `featureCount` is never stored; it is written on serialization from
/// `features.len()` and ignored when reading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLayer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub features: Vec<GeoFeature>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub source: LayerSource,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl GeoLayer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, features: Vec<GeoFeature>) -> Self {
        GeoLayer {
            id: id.into(),
            name: name.into(),
            features,
            visible: true,
            color: String::new(),
            opacity: default_opacity(),
            source: LayerSource::System,
            uploaded_at: None,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Build a pipeline output layer. Features are re-homed onto the new id.
    pub(crate) fn derived(
        id: String,
        name: String,
        features: Vec<GeoFeature>,
        style: &LayerStyle,
    ) -> GeoLayer {
        let features = features
            .into_iter()
            .map(|feature| feature.in_layer(id.clone()))
            .collect();
        GeoLayer {
            id,
            name,
            features,
            visible: true,
            color: style.color.clone(),
            opacity: style.opacity,
            source: LayerSource::Imported,
            uploaded_at: Some(Utc::now()),
        }
    }

    pub(crate) fn apply_style(&mut self, style: &LayerStyle) {
        self.color = style.color.clone();
        self.opacity = style.opacity;
    }

    pub fn style(&self) -> LayerStyle {
        LayerStyle {
            color: self.color.clone(),
            opacity: self.opacity,
        }
    }
}

impl Serialize for GeoLayer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.uploaded_at.is_some() { 9 } else { 8 };
        let mut state = serializer.serialize_struct("GeoLayer", fields)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("features", &self.features)?;
        state.serialize_field("visible", &self.visible)?;
        state.serialize_field("color", &self.color)?;
        state.serialize_field("opacity", &self.opacity)?;
        state.serialize_field("source", &self.source)?;
        if let Some(uploaded_at) = &self.uploaded_at {
            state.serialize_field("uploadedAt", uploaded_at)?;
        }
        state.serialize_field("featureCount", &self.feature_count())?;
        state.end()
    }
}

// Layer downloads: GeoJSON FeatureCollection, KML and CSV
use csv::Writer;
use quick_xml::escape::escape;
use serde_json::{json, Value};

use crate::error::{PipelineError, Result};
use crate::models::{FeatureGeometry, GeoFeature, GeoLayer, PolygonRings, Ring};

// Red outline, translucent red fill
const KML_DEFAULT_LINE_COLOR: &str = "ff0000ff";
const KML_DEFAULT_FILL_COLOR: &str = "4d0000ff";
const KML_DESCRIPTION: &str = "Exportado do Sistema de Licenciamento Ambiental";

fn feature_to_geojson(feature: &GeoFeature) -> Result<Value> {
    let (kind, coordinates) = match &feature.geometry {
        FeatureGeometry::Point(position) => ("Point", json!(position)),
        FeatureGeometry::Polygon(rings) => ("Polygon", json!(rings)),
        FeatureGeometry::MultiPolygon(polygons) => ("MultiPolygon", json!(polygons)),
        FeatureGeometry::Unsupported { kind, .. } => {
            return Err(PipelineError::UnsupportedGeometryType(kind.clone()))
        }
    };

    let mut properties = feature.properties.clone();
    properties.insert("id".to_string(), Value::from(feature.id.clone()));
    properties.insert("name".to_string(), Value::from(feature.name.clone()));
    properties.insert("layerId".to_string(), Value::from(feature.layer_id.clone()));

    Ok(json!({
        "type": "Feature",
        "geometry": {
            "type": kind,
            "coordinates": coordinates
        },
        "properties": properties
    }))
}

/// Every feature becomes a GeoJSON Feature whose properties also carry the
/// feature id, name and layer id.
pub fn to_feature_collection(layer: &GeoLayer) -> Result<Value> {
    let features = layer
        .features
        .iter()
        .map(feature_to_geojson)
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({
        "type": "FeatureCollection",
        "features": features
    }))
}

/// Download name for a layer: lowercase ASCII letters and digits, every other
/// run of characters collapsed to `_`, no leading or trailing `_`.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// `#RRGGBB` plus opacity as a KML `aabbggrr` color.
fn kml_color(hex: &str, opacity: f64) -> Option<String> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let (r, g, b) = (&hex[0..2], &hex[2..4], &hex[4..6]);
    Some(format!("{:02x}{}{}{}", alpha, b, g, r).to_lowercase())
}

fn kml_coordinates(ring: &Ring) -> String {
    ring.iter()
        .map(|[lng, lat]| format!("{},{},0", lng, lat))
        .collect::<Vec<_>>()
        .join(" ")
}

fn kml_polygon(rings: &PolygonRings) -> String {
    let mut out = String::from("<Polygon>");
    for (i, ring) in rings.iter().enumerate() {
        let boundary = if i == 0 { "outerBoundaryIs" } else { "innerBoundaryIs" };
        out.push_str(&format!(
            "<{b}><LinearRing><coordinates>{c}</coordinates></LinearRing></{b}>",
            b = boundary,
            c = kml_coordinates(ring)
        ));
    }
    out.push_str("</Polygon>");
    out
}

fn kml_geometry(feature: &GeoFeature) -> Result<String> {
    match &feature.geometry {
        FeatureGeometry::Point([lng, lat]) => {
            Ok(format!("<Point><coordinates>{},{},0</coordinates></Point>", lng, lat))
        }
        FeatureGeometry::Polygon(rings) => Ok(kml_polygon(rings)),
        FeatureGeometry::MultiPolygon(polygons) => Ok(format!(
            "<MultiGeometry>{}</MultiGeometry>",
            polygons.iter().map(kml_polygon).collect::<String>()
        )),
        FeatureGeometry::Unsupported { kind, .. } => {
            Err(PipelineError::UnsupportedGeometryType(kind.clone()))
        }
    }
}

/// KML document with one Placemark per feature. Every ring of every polygon
/// is written; the feature properties go to the description as JSON.
pub fn to_kml(layer: &GeoLayer) -> Result<String> {
    let line_color = kml_color(&layer.color, 1.0).unwrap_or_else(|| KML_DEFAULT_LINE_COLOR.to_string());
    let fill_color =
        kml_color(&layer.color, layer.opacity).unwrap_or_else(|| KML_DEFAULT_FILL_COLOR.to_string());

    let mut placemarks = String::new();
    for feature in &layer.features {
        let properties = Value::Object(feature.properties.clone()).to_string();
        placemarks.push_str(&format!(
            "\n    <Placemark>\n      <name>{}</name>\n      <description>{}</description>\n      \
             <Style><LineStyle><color>{}</color><width>2</width></LineStyle>\
             <PolyStyle><color>{}</color><fill>1</fill><outline>1</outline></PolyStyle></Style>\n      \
             {}\n    </Placemark>",
            escape(feature.name.as_str()),
            escape(properties.as_str()),
            line_color,
            fill_color,
            kml_geometry(feature)?
        ));
    }

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <kml xmlns=\"http://www.opengis.net/kml/2.2\">\n  <Document>\n    \
         <name>{}</name>\n    <description>{}</description>{}\n  </Document>\n</kml>\n",
        escape(layer.name.as_str()),
        KML_DESCRIPTION,
        placemarks
    ))
}

fn export_error(err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Export(err.to_string())
}

/// One row per feature: `id,name,type,geometry` with the coordinates as JSON.
pub fn to_csv(layer: &GeoLayer) -> Result<String> {
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(["id", "name", "type", "geometry"])
        .map_err(export_error)?;

    for feature in &layer.features {
        let coordinates = match &feature.geometry {
            FeatureGeometry::Point(position) => json!(position),
            FeatureGeometry::Polygon(rings) => json!(rings),
            FeatureGeometry::MultiPolygon(polygons) => json!(polygons),
            FeatureGeometry::Unsupported { coordinates, .. } => coordinates.clone(),
        };
        wtr.write_record([
            feature.id.as_str(),
            feature.name.as_str(),
            feature.geometry.type_name(),
            coordinates.to_string().as_str(),
        ])
        .map_err(export_error)?;
    }

    let data = wtr.into_inner().map_err(export_error)?;
    String::from_utf8(data).map_err(export_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{layer, multi_square, point, square, unsupported};

    #[test]
    fn features_carry_identity_in_properties() {
        let source = layer("imoveis", vec![square("1", 100.0).with_property("car", "RO-1"), point("2")]);
        let collection = to_feature_collection(&source).unwrap();

        assert_eq!(collection["type"], "FeatureCollection");
        let first = &collection["features"][0];
        assert_eq!(first["type"], "Feature");
        assert_eq!(first["geometry"]["type"], "Polygon");
        assert_eq!(first["geometry"]["coordinates"][0].as_array().unwrap().len(), 5);
        assert_eq!(first["properties"]["id"], "1");
        assert_eq!(first["properties"]["layerId"], "imoveis");
        assert_eq!(first["properties"]["car"], "RO-1");
        assert_eq!(collection["features"][1]["geometry"]["type"], "Point");
    }

    #[test]
    fn unsupported_features_cannot_be_exported() {
        let source = layer("a", vec![unsupported("1")]);
        assert_eq!(
            to_feature_collection(&source),
            Err(PipelineError::UnsupportedGeometryType("Unsupported".to_string()))
        );
        assert_eq!(
            to_kml(&source),
            Err(PipelineError::UnsupportedGeometryType("Unsupported".to_string()))
        );
    }

    #[test]
    fn filenames_are_lowercase_ascii_with_underscores() {
        assert_eq!(sanitize_filename("Imóveis - Buffer 50m"), "im_veis_buffer_50m");
        assert_eq!(sanitize_filename("  APP (Rio Madeira)  "), "app_rio_madeira");
        assert_eq!(sanitize_filename("***"), "");
    }

    #[test]
    fn kml_escapes_names_and_descriptions() {
        let mut feature = square("1", 100.0).with_property("obs", "a < b & \"c\"");
        feature.name = "Lote <1> & 'Sede'".to_string();
        let mut source = layer("a", vec![feature]);
        source.name = "Imóveis & APP".to_string();

        let kml = to_kml(&source).unwrap();
        assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(kml.contains("<name>Imóveis &amp; APP</name>"));
        assert!(kml.contains("<name>Lote &lt;1&gt; &amp; &apos;Sede&apos;</name>"));
        assert!(kml.contains("a &lt; b &amp; \\&quot;c\\&quot;"));
        assert!(!kml.contains("<1>"));
    }

    #[test]
    fn kml_writes_every_member_and_point() {
        let source = layer(
            "a",
            vec![
                multi_square("m", &[((-500.0, 0.0), 100.0), ((500.0, 0.0), 100.0)]),
                point("p"),
            ],
        );
        let kml = to_kml(&source).unwrap();

        assert_eq!(kml.matches("<Placemark>").count(), 2);
        assert_eq!(kml.matches("<MultiGeometry>").count(), 1);
        assert_eq!(kml.matches("<outerBoundaryIs>").count(), 2);
        assert!(kml.contains("<Point><coordinates>-63.85,-8.75,0</coordinates></Point>"));
    }

    #[test]
    fn kml_style_follows_layer_palette() {
        let mut source = layer("a", vec![square("1", 100.0)]);
        source.color = "#F59E0B".to_string();
        source.opacity = 0.35;
        let kml = to_kml(&source).unwrap();
        assert!(kml.contains("<LineStyle><color>ff0b9ef5</color>"));
        assert!(kml.contains("<PolyStyle><color>590b9ef5</color>"));

        source.color = "laranja".to_string();
        let kml = to_kml(&source).unwrap();
        assert!(kml.contains("<color>ff0000ff</color>"));
        assert!(kml.contains("<color>4d0000ff</color>"));
    }

    #[test]
    fn csv_has_header_and_quoted_rows() {
        let mut named = point("1");
        named.name = "Poço \"Norte\", sede".to_string();
        let source = layer("a", vec![named, unsupported("2")]);

        let csv = to_csv(&source).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,name,type,geometry");
        assert_eq!(lines[1], "1,\"Poço \"\"Norte\"\", sede\",Point,\"[-63.85,-8.75]\"");
        assert_eq!(lines[2], "2,Linha 2,Unsupported,null");
        assert_eq!(lines.len(), 3);
    }
}

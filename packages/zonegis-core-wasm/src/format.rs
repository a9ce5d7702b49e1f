// pt-BR display formatting for the metrics table
use serde::Serialize;

use crate::metrics::LayerMetrics;

pub const AREA_DECIMALS: usize = 2;
pub const PERCENT_DECIMALS: usize = 1;

/// Fixed decimals with `.` thousands and `,` decimal separators, as the
/// licensing UI shows numbers (`1234567.891` with 2 decimals is `1.234.567,89`).
pub fn format_number(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let digits = integer.len();
    let mut grouped = String::with_capacity(digits + digits / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let mut out = String::new();
    // No sign on values that round to zero
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(fraction) = fraction {
        out.push(',');
        out.push_str(fraction);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRow {
    pub id: String,
    pub name: String,
    pub area_ha: String,
    pub area_m2: String,
    pub perimetro_km: String,
    /// Empty when the layer has no area.
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_area_ha: String,
    pub total_area_m2: String,
    pub total_perimetro_km: String,
    pub total_perimetro_m: String,
    pub feature_count: usize,
    pub average_area_ha: String,
    pub rows: Vec<MetricsRow>,
}

impl LayerMetrics {
    /// Rounded, localized view of the metrics. The metrics themselves are not touched.
    pub fn summary(&self) -> MetricsSummary {
        let rows = self
            .features
            .iter()
            .map(|feature| MetricsRow {
                id: feature.id.clone(),
                name: feature.name.clone(),
                area_ha: format_number(feature.area_ha, AREA_DECIMALS),
                area_m2: format_number(feature.area_m2, 0),
                perimetro_km: format_number(feature.perimetro_km, AREA_DECIMALS),
                percentage: self
                    .percentage_of_total(feature)
                    .map(|percent| format_number(percent, PERCENT_DECIMALS))
                    .unwrap_or_default(),
            })
            .collect();

        MetricsSummary {
            total_area_ha: format_number(self.total_area_ha, AREA_DECIMALS),
            total_area_m2: format_number(self.total_area_m2, 0),
            total_perimetro_km: format_number(self.total_perimetro_km, AREA_DECIMALS),
            total_perimetro_m: format_number(self.total_perimetro_km * 1000.0, 0),
            feature_count: self.features.len(),
            average_area_ha: self
                .average_area_ha()
                .map(|average| format_number(average, AREA_DECIMALS))
                .unwrap_or_default(),
            rows,
        }
    }
}

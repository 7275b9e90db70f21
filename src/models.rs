// src/models.rs
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Pest,
    Soil,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Pest => "pest",
            AnalysisKind::Soil => "soil",
        }
    }
}

/// A file as the user selected it, before validation.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A validated, displayable image owned by exactly one analysis request.
#[derive(Clone)]
pub struct ImageAsset {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub dimensions: Option<(u32, u32)>,
    pub data: Bytes,
    pub selected_at: DateTime<Utc>,
}

impl ImageAsset {
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.data)
        )
    }

    pub fn summary(&self, include_data_uri: bool) -> ImageSummary {
        ImageSummary {
            id: self.id,
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
            width: self.dimensions.map(|(w, _)| w),
            height: self.dimensions.map(|(_, h)| h),
            data_uri: include_data_uri.then(|| self.data_uri()),
            selected_at: self.selected_at,
        }
    }
}

// Payload bytes are left out so logging an asset stays cheap.
impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.size_bytes)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_uri: Option<String>,
    pub selected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestReport {
    pub label: String,
    pub confidence: f32,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub chemical_treatments: Vec<String>,
    #[serde(default)]
    pub organic_treatments: Vec<String>,
    #[serde(default)]
    pub prevention_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitableCrop {
    pub name: String,
    pub season: String,
    pub suitability_percent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilReport {
    pub soil_type: String,
    pub health_score: f32,
    pub ph: f32,
    pub nitrogen: f32,
    pub phosphorus: f32,
    pub potassium: f32,
    pub moisture: f32,
    pub organic_matter_percent: f32,
    #[serde(default)]
    pub suitable_crops: Vec<SuitableCrop>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

pub const PERCENT_MAX: f32 = 100.0;
pub const PH_MAX: f32 = 14.0;

/// Clamps into `[0, max]`; NaN collapses to zero.
pub fn clamp_unit(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, max)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticReport {
    Pest(PestReport),
    Soil(SoilReport),
}

impl DiagnosticReport {
    pub fn kind(&self) -> AnalysisKind {
        match self {
            DiagnosticReport::Pest(_) => AnalysisKind::Pest,
            DiagnosticReport::Soil(_) => AnalysisKind::Soil,
        }
    }

    /// Brings every score back into its documented range. List order is untouched.
    pub fn normalized(self) -> Self {
        match self {
            DiagnosticReport::Pest(mut report) => {
                report.confidence = clamp_unit(report.confidence, PERCENT_MAX);
                DiagnosticReport::Pest(report)
            }
            DiagnosticReport::Soil(mut report) => {
                report.health_score = clamp_unit(report.health_score, PERCENT_MAX);
                report.ph = clamp_unit(report.ph, PH_MAX);
                report.nitrogen = clamp_unit(report.nitrogen, PERCENT_MAX);
                report.phosphorus = clamp_unit(report.phosphorus, PERCENT_MAX);
                report.potassium = clamp_unit(report.potassium, PERCENT_MAX);
                report.moisture = clamp_unit(report.moisture, PERCENT_MAX);
                report.organic_matter_percent =
                    clamp_unit(report.organic_matter_percent, PERCENT_MAX);
                for crop in &mut report.suitable_crops {
                    crop.suitability_percent = clamp_unit(crop.suitability_percent, PERCENT_MAX);
                }
                DiagnosticReport::Soil(report)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn soil(values: [f32; 8]) -> SoilReport {
        SoilReport {
            soil_type: "Loam".into(),
            health_score: values[0],
            ph: values[1],
            nitrogen: values[2],
            phosphorus: values[3],
            potassium: values[4],
            moisture: values[5],
            organic_matter_percent: values[6],
            suitable_crops: vec![
                SuitableCrop {
                    name: "Tomato".into(),
                    season: "Summer".into(),
                    suitability_percent: values[7],
                },
                SuitableCrop {
                    name: "Wheat".into(),
                    season: "Winter".into(),
                    suitability_percent: 50.0,
                },
            ],
            recommendations: vec!["b".into(), "a".into()],
        }
    }

    #[test]
    fn normalizing_clamps_out_of_range_soil_values() {
        let report = DiagnosticReport::Soil(soil([120.0, 15.2, -3.0, 40.0, 101.0, f32::NAN, 3.2, 140.0]))
            .normalized();
        let DiagnosticReport::Soil(s) = report else {
            panic!("expected soil report");
        };
        assert_eq!(s.health_score, 100.0);
        assert_eq!(s.ph, 14.0);
        assert_eq!(s.nitrogen, 0.0);
        assert_eq!(s.phosphorus, 40.0);
        assert_eq!(s.potassium, 100.0);
        assert_eq!(s.moisture, 0.0);
        assert_eq!(s.organic_matter_percent, 3.2);
        assert_eq!(s.suitable_crops[0].suitability_percent, 100.0);
        assert_eq!(s.recommendations, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(s.suitable_crops[1].name, "Wheat");
    }

    #[test]
    fn report_json_is_tagged_by_kind() {
        let json = serde_json::json!({
            "kind": "pest",
            "label": "Aphids",
            "confidence": 92.0,
            "severity": "Moderate",
            "description": "Sap feeders",
            "symptoms": ["Curling leaves"]
        });
        let report: DiagnosticReport = serde_json::from_value(json).unwrap();
        assert_eq!(report.kind(), AnalysisKind::Pest);
        let DiagnosticReport::Pest(p) = report else {
            panic!("expected pest report");
        };
        assert_eq!(p.severity, Severity::Moderate);
        assert!(p.chemical_treatments.is_empty());
    }

    #[test]
    fn data_uri_uses_mime_type() {
        let asset = ImageAsset {
            id: Uuid::new_v4(),
            filename: "leaf.png".into(),
            mime_type: "image/png".into(),
            size_bytes: 3,
            dimensions: None,
            data: Bytes::from_static(b"abc"),
            selected_at: Utc::now(),
        };
        assert_eq!(asset.data_uri(), "data:image/png;base64,YWJj");
        assert!(asset.summary(false).data_uri.is_none());
    }

    proptest! {
        #[test]
        fn normalized_soil_reports_stay_in_bounds(values in proptest::array::uniform8(any::<f32>())) {
            let DiagnosticReport::Soil(s) = DiagnosticReport::Soil(soil(values)).normalized() else {
                unreachable!();
            };
            prop_assert!((0.0..=PH_MAX).contains(&s.ph));
            for v in [s.health_score, s.nitrogen, s.phosphorus, s.potassium, s.moisture, s.organic_matter_percent] {
                prop_assert!((0.0..=PERCENT_MAX).contains(&v));
            }
            for crop in &s.suitable_crops {
                prop_assert!((0.0..=PERCENT_MAX).contains(&crop.suitability_percent));
            }
        }
    }
}

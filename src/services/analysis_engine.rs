// src/services/analysis_engine.rs
use crate::errors::EngineError;
use crate::models::*;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

/// Turns image data into a diagnostic report. Implementations own their transport,
/// timeouts and error classification; callers only see `EngineError` reasons.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn analyze(
        &self,
        image: &ImageAsset,
        kind: AnalysisKind,
    ) -> Result<DiagnosticReport, EngineError>;

    fn name(&self) -> &str;
}

/// Development engine: waits a fixed delay, then returns a canned report per kind.
pub struct MockEngine {
    delay: Duration,
}

impl MockEngine {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AnalysisEngine for MockEngine {
    async fn analyze(
        &self,
        image: &ImageAsset,
        kind: AnalysisKind,
    ) -> Result<DiagnosticReport, EngineError> {
        debug!(
            "mock {} analysis of {} ({} bytes), replying in {:?}",
            kind.as_str(),
            image.filename,
            image.size_bytes,
            self.delay
        );

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(match kind {
            AnalysisKind::Pest => DiagnosticReport::Pest(sample_pest_report()),
            AnalysisKind::Soil => DiagnosticReport::Soil(sample_soil_report()),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn sample_pest_report() -> PestReport {
    PestReport {
        label: "Aphids".to_string(),
        confidence: 92.0,
        severity: Severity::Moderate,
        description: "Small, soft-bodied insects that feed on plant sap".to_string(),
        symptoms: strings(&[
            "Yellowing and curling of leaves",
            "Sticky honeydew on plant surfaces",
            "Stunted plant growth",
            "Presence of ants (attracted to honeydew)",
        ]),
        chemical_treatments: strings(&[
            "Imidacloprid-based insecticides",
            "Malathion spray (follow label instructions)",
            "Systemic insecticides for severe infestations",
        ]),
        organic_treatments: strings(&[
            "Neem oil spray (2-3 times per week)",
            "Insecticidal soap solution",
            "Release ladybugs as natural predators",
            "Garlic and chili pepper spray",
        ]),
        prevention_tips: strings(&[
            "Regular monitoring of plants",
            "Maintain proper plant spacing",
            "Avoid over-fertilization with nitrogen",
            "Encourage beneficial insects",
        ]),
    }
}

pub fn sample_soil_report() -> SoilReport {
    let crop = |name: &str, season: &str, suitability_percent: f32| SuitableCrop {
        name: name.to_string(),
        season: season.to_string(),
        suitability_percent,
    };

    SoilReport {
        soil_type: "Loamy Clay".to_string(),
        health_score: 78.0,
        ph: 6.5,
        nitrogen: 65.0,
        phosphorus: 45.0,
        potassium: 82.0,
        moisture: 38.0,
        organic_matter_percent: 3.2,
        suitable_crops: vec![
            crop("Tomato", "Summer", 95.0),
            crop("Wheat", "Winter", 88.0),
            crop("Cotton", "Kharif", 75.0),
            crop("Onion", "Rabi", 92.0),
        ],
        recommendations: strings(&[
            "Add organic compost to improve soil structure",
            "Consider lime application to optimize pH",
            "Implement crop rotation to maintain soil health",
            "Install drip irrigation for water efficiency",
        ]),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! Display sections shared by every screen.
//!
//! A report is mapped to an ordered list of sections: summary first, then
//! metrics, cards and bulleted lists in the order the report carries them.
//! Rendering is a pure function of the report.

use serde::Serialize;

use crate::models::{DiagnosticReport, PERCENT_MAX, PH_MAX, PestReport, Severity, SoilReport};

/// Scores strictly above this are highlighted.
pub const EMPHASIS_THRESHOLD: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub text: String,
    pub tone: Tone,
    pub emphasized: bool,
}

impl Badge {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            emphasized: false,
        }
    }

    pub fn emphasized(mut self, emphasized: bool) -> Self {
        self.emphasized = emphasized;
        self
    }
}

/// A labelled progress indicator; `progress` is on a 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub display: String,
    pub progress: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: Option<String>,
    pub badge: Option<Badge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStyle {
    Bullet,
    Checklist,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Summary {
        title: String,
        headline: String,
        badges: Vec<Badge>,
        description: Option<String>,
    },
    Metrics {
        title: String,
        metrics: Vec<Metric>,
    },
    Cards {
        title: String,
        cards: Vec<Card>,
    },
    List {
        title: String,
        style: ListStyle,
        items: Vec<String>,
    },
}

impl Section {
    pub fn title(&self) -> &str {
        match self {
            Section::Summary { title, .. }
            | Section::Metrics { title, .. }
            | Section::Cards { title, .. }
            | Section::List { title, .. } => title,
        }
    }

    /// `None` for an empty list so screens don't show bare headings.
    pub fn list(title: &str, style: ListStyle, items: &[String]) -> Option<Section> {
        (!items.is_empty()).then(|| Section::List {
            title: title.to_string(),
            style,
            items: items.to_vec(),
        })
    }
}

/// One decimal at most, no trailing `.0`.
pub fn format_number(value: f32) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    format!("{}", rounded)
}

pub fn percent_metric(label: &str, value: f32) -> Metric {
    Metric {
        label: label.to_string(),
        display: format!("{}%", format_number(value)),
        progress: value.clamp(0.0, PERCENT_MAX),
    }
}

pub fn render_report(report: &DiagnosticReport) -> Vec<Section> {
    match report {
        DiagnosticReport::Pest(pest) => render_pest(pest),
        DiagnosticReport::Soil(soil) => render_soil(soil),
    }
}

fn render_pest(report: &PestReport) -> Vec<Section> {
    let severity_tone = match report.severity {
        Severity::High => Tone::Danger,
        Severity::Moderate => Tone::Warning,
        Severity::Low => Tone::Neutral,
    };

    let mut sections = vec![Section::Summary {
        title: "Detection Results".to_string(),
        headline: report.label.clone(),
        badges: vec![
            Badge::new(
                format!("Confidence: {}%", format_number(report.confidence)),
                Tone::Info,
            ),
            Badge::new(format!("Severity: {}", report.severity.as_str()), severity_tone)
                .emphasized(report.severity == Severity::High),
        ],
        description: Some(report.description.clone()).filter(|d| !d.is_empty()),
    }];

    sections.extend(
        [
            Section::list("Symptoms", ListStyle::Bullet, &report.symptoms),
            Section::list(
                "Chemical Treatment",
                ListStyle::Bullet,
                &report.chemical_treatments,
            ),
            Section::list(
                "Organic Treatment",
                ListStyle::Bullet,
                &report.organic_treatments,
            ),
            Section::list(
                "Prevention Tips",
                ListStyle::Checklist,
                &report.prevention_tips,
            ),
        ]
        .into_iter()
        .flatten(),
    );

    sections
}

fn render_soil(report: &SoilReport) -> Vec<Section> {
    let mut sections = vec![
        Section::Summary {
            title: "Soil Analysis Results".to_string(),
            headline: report.soil_type.clone(),
            badges: vec![
                Badge::new(
                    format!("Health Score: {}%", format_number(report.health_score)),
                    Tone::Success,
                )
                .emphasized(report.health_score > EMPHASIS_THRESHOLD),
            ],
            description: None,
        },
        Section::Metrics {
            title: "Soil Composition".to_string(),
            metrics: vec![
                Metric {
                    label: "pH Level".to_string(),
                    display: format_number(report.ph),
                    progress: (report.ph / PH_MAX * 100.0).clamp(0.0, PERCENT_MAX),
                },
                percent_metric("Nitrogen (N)", report.nitrogen),
                percent_metric("Phosphorus (P)", report.phosphorus),
                percent_metric("Potassium (K)", report.potassium),
                percent_metric("Moisture Content", report.moisture),
                // organic matter sits in 0–10 in practice, so it is drawn at 10x
                Metric {
                    label: "Organic Matter".to_string(),
                    display: format!("{}%", format_number(report.organic_matter_percent)),
                    progress: (report.organic_matter_percent * 10.0).clamp(0.0, PERCENT_MAX),
                },
            ],
        },
    ];

    if !report.suitable_crops.is_empty() {
        sections.push(Section::Cards {
            title: "Suitable Crops".to_string(),
            cards: report
                .suitable_crops
                .iter()
                .map(|crop| Card {
                    title: crop.name.clone(),
                    subtitle: Some(format!("Season: {}", crop.season)),
                    badge: Some(
                        Badge::new(
                            format!("{}% suitable", format_number(crop.suitability_percent)),
                            Tone::Success,
                        )
                        .emphasized(crop.suitability_percent > EMPHASIS_THRESHOLD),
                    ),
                })
                .collect(),
        });
    }

    sections.extend(Section::list(
        "AI Recommendations",
        ListStyle::Checklist,
        &report.recommendations,
    ));

    sections
}

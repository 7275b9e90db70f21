// src/services/llm_service.rs
use crate::errors::EngineError;
use crate::models::*;
use crate::services::analysis_engine::AnalysisEngine;
use crate::services::image_processor::ImageProcessor;
use crate::services::inference_client::{classify_transport_error, reason_for_status};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use log::warn;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// Anthropic caps base64 images at 5MB; base64 adds ~33%.
const ANTHROPIC_MAX_RAW_BYTES: usize = 3_750_000;

const PEST_PROMPT: &str = r#"
You are an agronomist. Identify the pest or plant disease visible in this photo.

Return only JSON with this structure:
{
    "kind": "pest",
    "label": "common name of the pest or disease",
    "confidence": 0-100,
    "severity": "Low" | "Moderate" | "High",
    "description": "one sentence",
    "symptoms": ["..."],
    "chemical_treatments": ["..."],
    "organic_treatments": ["..."],
    "prevention_tips": ["..."]
}
"#;

const SOIL_PROMPT: &str = r#"
You are a soil scientist. Assess the soil visible in this photo.

Return only JSON with this structure:
{
    "kind": "soil",
    "soil_type": "...",
    "health_score": 0-100,
    "ph": 0-14,
    "nitrogen": 0-100,
    "phosphorus": 0-100,
    "potassium": 0-100,
    "moisture": 0-100,
    "organic_matter_percent": 0-100,
    "suitable_crops": [{"name": "...", "season": "...", "suitability_percent": 0-100}],
    "recommendations": ["..."]
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisionProvider {
    OpenAi,
    Anthropic,
}

impl VisionProvider {
    fn default_model(&self) -> &'static str {
        match self {
            VisionProvider::OpenAi => "gpt-4o",
            VisionProvider::Anthropic => "claude-3-5-sonnet-20241022",
        }
    }
}

/// Analysis engine that asks a hosted vision LLM for the report JSON.
pub struct VisionLlmEngine {
    provider: VisionProvider,
    api_key: String,
    model: String,
    client: Client,
    image_processor: Arc<ImageProcessor>,
}

impl VisionLlmEngine {
    pub fn new(
        provider: VisionProvider,
        api_key: String,
        model: Option<String>,
        timeout: Duration,
        image_processor: Arc<ImageProcessor>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            provider,
            api_key,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            client: Client::builder().timeout(timeout).build()?,
            image_processor,
        })
    }

    async fn ask_openai(&self, prompt: &str, image: &ImageAsset) -> Result<String, EngineError> {
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        {
                            "type": "image_url",
                            "image_url": { "url": image.data_uri() }
                        }
                    ]
                }],
                "max_tokens": 2048,
                "response_format": { "type": "json_object" }
            }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::new(
                reason_for_status(status),
                format!("OpenAI error: {}", error_text),
            ));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::unknown(format!("Failed to parse OpenAI response: {}", e)))?;

        result["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineError::unknown("No content in OpenAI response"))
    }

    async fn ask_anthropic(&self, prompt: &str, image: &ImageAsset) -> Result<String, EngineError> {
        let shrunk = self
            .image_processor
            .shrink_to_fit(&image.data, ANTHROPIC_MAX_RAW_BYTES)?;
        let media_type = if shrunk.len() == image.data.len() {
            image.mime_type.as_str()
        } else {
            "image/jpeg"
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "max_tokens": 2048,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": media_type,
                                "data": general_purpose::STANDARD.encode(&shrunk)
                            }
                        }
                    ]
                }]
            }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EngineError::new(
                reason_for_status(status),
                format!("Anthropic error: {}", error_text),
            ));
        }

        let result: serde_json::Value = response.json().await.map_err(|e| {
            EngineError::unknown(format!("Failed to parse Anthropic response: {}", e))
        })?;

        result["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineError::unknown("No content in Anthropic response"))
    }
}

#[async_trait]
impl AnalysisEngine for VisionLlmEngine {
    async fn analyze(
        &self,
        image: &ImageAsset,
        kind: AnalysisKind,
    ) -> Result<DiagnosticReport, EngineError> {
        let prompt = match kind {
            AnalysisKind::Pest => PEST_PROMPT,
            AnalysisKind::Soil => SOIL_PROMPT,
        };

        let content = match self.provider {
            VisionProvider::OpenAi => self.ask_openai(prompt, image).await?,
            VisionProvider::Anthropic => self.ask_anthropic(prompt, image).await?,
        };

        parse_report(&content, kind).inspect_err(|e| {
            warn!("{} returned an unusable report: {}", self.name(), e);
        })
    }

    fn name(&self) -> &str {
        match self.provider {
            VisionProvider::OpenAi => "openai",
            VisionProvider::Anthropic => "anthropic",
        }
    }
}

/// Pull the report JSON out of a model reply. Models sometimes wrap JSON in a
/// fenced block or omit the `kind` tag.
fn parse_report(content: &str, kind: AnalysisKind) -> Result<DiagnosticReport, EngineError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if s < e => &content[s..=e],
        _ => return Err(EngineError::unknown("No JSON object in model reply")),
    };

    let mut value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| EngineError::unknown(format!("Failed to parse report JSON: {}", e)))?;

    if let Some(obj) = value.as_object_mut() {
        obj.entry("kind").or_insert_with(|| json!(kind.as_str()));
    }

    serde_json::from_value(value)
        .map_err(|e| EngineError::unknown(format!("Report does not match schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineErrorReason;

    #[test]
    fn parses_fenced_reply_without_kind_tag() {
        let reply = r#"Here you go:
```json
{"soil_type": "Sandy", "health_score": 55, "ph": 7.1, "nitrogen": 20, "phosphorus": 30,
 "potassium": 40, "moisture": 12, "organic_matter_percent": 1.5,
 "suitable_crops": [{"name": "Millet", "season": "Kharif", "suitability_percent": 85}],
 "recommendations": ["Mulch to retain moisture"]}
```"#;
        let report = parse_report(reply, AnalysisKind::Soil).unwrap();
        let DiagnosticReport::Soil(soil) = report else {
            panic!("expected soil report");
        };
        assert_eq!(soil.soil_type, "Sandy");
        assert_eq!(soil.suitable_crops[0].name, "Millet");
    }

    #[test]
    fn reply_without_json_is_unknown_failure() {
        let err = parse_report("I cannot see any plant.", AnalysisKind::Pest).unwrap_err();
        assert_eq!(err.reason, EngineErrorReason::Unknown);
    }

    #[test]
    fn reply_missing_fields_is_rejected() {
        let err = parse_report(r#"{"label": "Rust"}"#, AnalysisKind::Pest).unwrap_err();
        assert!(err.message.contains("schema"));
    }

    #[test]
    fn default_models_per_provider() {
        assert_eq!(VisionProvider::OpenAi.default_model(), "gpt-4o");
        assert_eq!(
            VisionProvider::Anthropic.default_model(),
            "claude-3-5-sonnet-20241022"
        );
    }
}

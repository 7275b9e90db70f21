// src/services/inference_client.rs
use crate::errors::{EngineError, EngineErrorReason};
use crate::models::*;
use crate::services::analysis_engine::AnalysisEngine;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Analysis engine backed by a model-serving HTTP endpoint.
///
/// The endpoint receives `{kind, media_type, image_base64}` and answers with a
/// `DiagnosticReport` tagged by `kind`.
pub struct RemoteEngine {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    kind: AnalysisKind,
    media_type: &'a str,
    image_base64: String,
}

impl RemoteEngine {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl AnalysisEngine for RemoteEngine {
    async fn analyze(
        &self,
        image: &ImageAsset,
        kind: AnalysisKind,
    ) -> Result<DiagnosticReport, EngineError> {
        let body = InferenceRequest {
            kind,
            media_type: &image.mime_type,
            image_base64: general_purpose::STANDARD.encode(&image.data),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        debug!("posting {} analysis to {}", kind.as_str(), self.endpoint);

        let response = request.send().await.map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("inference endpoint returned {}: {}", status, error_text);
            return Err(EngineError::new(
                reason_for_status(status),
                format!("Inference endpoint returned {}: {}", status, error_text),
            ));
        }

        response
            .json::<DiagnosticReport>()
            .await
            .map_err(|e| EngineError::unknown(format!("Failed to parse inference response: {}", e)))
    }

    fn name(&self) -> &str {
        "remote"
    }
}

pub(crate) fn classify_transport_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::timeout(format!("Inference request timed out: {}", e))
    } else if e.is_connect() {
        EngineError::unreachable(format!("Inference endpoint unreachable: {}", e))
    } else {
        EngineError::unknown(format!("Inference request failed: {}", e))
    }
}

pub(crate) fn reason_for_status(status: StatusCode) -> EngineErrorReason {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => EngineErrorReason::InvalidImage,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => EngineErrorReason::Timeout,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            EngineErrorReason::Unreachable
        }
        _ => EngineErrorReason::Unknown,
    }
}

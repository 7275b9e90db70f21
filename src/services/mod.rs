// src/services/mod.rs
pub mod analysis_engine;
pub mod image_processor;
pub mod inference_client;
pub mod llm_service;
pub mod session_store;

pub use analysis_engine::{AnalysisEngine, MockEngine};
pub use image_processor::ImageProcessor;
pub use inference_client::RemoteEngine;
pub use llm_service::{VisionLlmEngine, VisionProvider};
pub use session_store::SessionStore;

use crate::config::{EngineBackend, EngineConfig};
use crate::errors::AgriError;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured engine. Remote backends need their endpoint or key set.
pub fn build_engine(
    config: &EngineConfig,
    image_processor: Arc<ImageProcessor>,
) -> Result<Arc<dyn AnalysisEngine>, AgriError> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let engine: Arc<dyn AnalysisEngine> = match config.backend {
        EngineBackend::Mock => Arc::new(MockEngine::new(Duration::from_millis(
            config.mock_delay_ms,
        ))),
        EngineBackend::Remote => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                AgriError::Config("engine.endpoint must be set for the remote backend".into())
            })?;
            Arc::new(
                RemoteEngine::new(endpoint, config.api_key.clone(), timeout)
                    .map_err(|e| AgriError::Config(e.to_string()))?,
            )
        }
        EngineBackend::Openai | EngineBackend::Anthropic => {
            let provider = match config.backend {
                EngineBackend::Openai => VisionProvider::OpenAi,
                _ => VisionProvider::Anthropic,
            };
            let api_key = config.api_key.clone().ok_or_else(|| {
                AgriError::Config("engine.api_key must be set for LLM backends".into())
            })?;
            Arc::new(
                VisionLlmEngine::new(
                    provider,
                    api_key,
                    config.model.clone(),
                    timeout,
                    image_processor,
                )
                .map_err(|e| AgriError::Config(e.to_string()))?,
            )
        }
    };

    Ok(engine)
}

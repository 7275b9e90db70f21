//! Service configuration.
//!
//! Values are layered in this order, later sources winning:
//! 1. Defaults in code
//! 2. `config/default.toml` (optional)
//! 3. Environment variables with the `AGRI__` prefix, e.g. `AGRI__ENGINE__BACKEND=remote`

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub analysis: AnalysisConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Image acceptance policy and session housekeeping.
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Mime types a selected image may declare
    pub accepted_types: Vec<String>,

    /// Upper bound on the raw upload size
    pub max_image_bytes: usize,

    /// Largest width or height accepted
    pub max_dimension: u32,

    /// Idle sessions older than this are purged
    pub session_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngineBackend {
    Mock,
    Remote,
    Openai,
    Anthropic,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub backend: EngineBackend,

    /// Artificial latency of the mock engine
    pub mock_delay_ms: u64,

    /// Model-serving endpoint for the remote backend
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    /// Model name for the vision LLM backends
    pub model: Option<String>,

    pub timeout_secs: u64,
}

impl Settings {
    /// Load from defaults, `config/default.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("AGRI")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("analysis.accepted_types")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080_i64)?
            .set_default(
                "analysis.accepted_types",
                vec!["image/jpeg", "image/png", "image/webp", "image/gif"],
            )?
            .set_default("analysis.max_image_bytes", 10_i64 * 1024 * 1024)?
            .set_default("analysis.max_dimension", 8192_i64)?
            .set_default("analysis.session_ttl_secs", 86400_i64)?
            .set_default("engine.backend", "mock")?
            .set_default("engine.mock_delay_ms", 3000_i64)?
            .set_default("engine.timeout_secs", 60_i64)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

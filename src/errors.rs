// src/errors.rs
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AnalysisKind;

/// Raised synchronously when a selected file cannot become an `ImageAsset`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Unsupported file type: {mime_type}")]
    UnsupportedType { mime_type: String },

    #[error("File is {size_bytes} bytes, limit is {max_bytes} bytes")]
    TooLarge { size_bytes: usize, max_bytes: usize },

    #[error("Image dimensions {width}x{height} exceed {max}x{max}")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },

    #[error("File is empty")]
    Empty,

    #[error("File content does not match declared type {declared}")]
    ContentMismatch { declared: String },
}

/// A trigger arrived in a state that does not allow it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Cannot analyze: no image selected")]
    NoImage,

    #[error("Analysis already in progress")]
    AlreadyAnalyzing,

    #[error("Cannot {action} while request is {state}")]
    WrongState {
        action: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorReason {
    Timeout,
    Unreachable,
    InvalidImage,
    Unknown,
}

impl EngineErrorReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineErrorReason::Timeout => "timeout",
            EngineErrorReason::Unreachable => "unreachable",
            EngineErrorReason::InvalidImage => "invalid_image",
            EngineErrorReason::Unknown => "unknown",
        }
    }
}

/// Failure reported by an `AnalysisEngine`. Terminal for the request that issued it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Analysis engine error ({}): {message}", .reason.as_str())]
pub struct EngineError {
    pub reason: EngineErrorReason,
    pub message: String,
}

impl EngineError {
    pub fn new(reason: EngineErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(EngineErrorReason::Timeout, message)
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(EngineErrorReason::Unreachable, message)
    }

    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::new(EngineErrorReason::InvalidImage, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(EngineErrorReason::Unknown, message)
    }

    pub fn kind_mismatch(expected: AnalysisKind, got: AnalysisKind) -> Self {
        Self::unknown(format!(
            "Engine returned a {} report for a {} request",
            got.as_str(),
            expected.as_str()
        ))
    }
}

#[derive(Error, Debug)]
pub enum AgriError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Analysis session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for AgriError {
    fn from(e: config::ConfigError) -> Self {
        AgriError::Config(e.to_string())
    }
}

impl ResponseError for AgriError {
    fn status_code(&self) -> StatusCode {
        match self {
            AgriError::Validation(ValidationError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AgriError::Validation(ValidationError::UnsupportedType { .. })
            | AgriError::Validation(ValidationError::ContentMismatch { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AgriError::Validation(_) | AgriError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AgriError::Precondition(_) => StatusCode::CONFLICT,
            AgriError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AgriError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let label = match self {
            AgriError::Validation(_) => "Validation error",
            AgriError::Precondition(_) => "Precondition failed",
            AgriError::SessionNotFound(_) => "Not found",
            AgriError::BadRequest(_) => "Bad request",
            AgriError::Config(_) => "Configuration error",
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": label,
            "message": self.to_string()
        }))
    }
}

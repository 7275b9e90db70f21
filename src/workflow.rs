//! Lifecycle of one image-to-report attempt.
//!
//! ```text
//! Idle ──select──▶ Ready ──analyze──▶ Analyzing ──ok──▶ Completed
//!                    ▲                    │
//!                    │                    └──err──▶ Failed ──retry──┐
//!                    └─────────────── select (any state) ───────────┘
//! ```
//!
//! Every accepted image and every analysis start bumps a generation counter.
//! An engine resolution carries the generation it was issued under and is
//! dropped if the request has moved on.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{EngineError, EngineErrorReason, PreconditionError, ValidationError};
use crate::models::{AnalysisKind, DiagnosticReport, ImageAsset, ImageSummary, ImageUpload};
use crate::render::{Section, render_report};
use crate::services::ImageProcessor;

#[derive(Debug, Clone)]
pub enum AnalysisState {
    Idle,
    Ready {
        image: ImageAsset,
    },
    Analyzing {
        image: ImageAsset,
        started_at: DateTime<Utc>,
    },
    Completed {
        image: ImageAsset,
        started_at: DateTime<Utc>,
        report: DiagnosticReport,
    },
    Failed {
        image: ImageAsset,
        started_at: DateTime<Utc>,
        error: EngineError,
    },
}

impl AnalysisState {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisState::Idle => "idle",
            AnalysisState::Ready { .. } => "ready",
            AnalysisState::Analyzing { .. } => "analyzing",
            AnalysisState::Completed { .. } => "completed",
            AnalysisState::Failed { .. } => "failed",
        }
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        match self {
            AnalysisState::Idle => None,
            AnalysisState::Ready { image }
            | AnalysisState::Analyzing { image, .. }
            | AnalysisState::Completed { image, .. }
            | AnalysisState::Failed { image, .. } => Some(image),
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AnalysisState::Analyzing { started_at, .. }
            | AnalysisState::Completed { started_at, .. }
            | AnalysisState::Failed { started_at, .. } => Some(*started_at),
            _ => None,
        }
    }
}

/// Issued when analysis starts; hand it to the engine and back to `resolve`.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub request_id: Uuid,
    pub kind: AnalysisKind,
    pub generation: u64,
    pub image: ImageAsset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Completed,
    Failed,
    /// The request moved on; the outcome was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    id: Uuid,
    kind: AnalysisKind,
    state: AnalysisState,
    generation: u64,
    validation_error: Option<ValidationError>,
    engine: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AnalysisRequest {
    pub fn new(kind: AnalysisKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            state: AnalysisState::Idle,
            generation: 0,
            validation_error: None,
            engine: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        self.state.image()
    }

    pub fn result(&self) -> Option<&DiagnosticReport> {
        match &self.state {
            AnalysisState::Completed { report, .. } => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&EngineError> {
        match &self.state {
            AnalysisState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn can_analyze(&self) -> bool {
        matches!(self.state, AnalysisState::Ready { .. })
    }

    /// Validate an upload and, if it passes, make it the current image.
    /// A rejected upload leaves state and image untouched.
    pub fn select_image(
        &mut self,
        processor: &ImageProcessor,
        upload: ImageUpload,
    ) -> Result<(), ValidationError> {
        let ImageUpload {
            filename,
            content_type,
            data,
        } = upload;

        match processor.accept(filename, content_type.as_deref(), data) {
            Ok(image) => {
                self.replace_image(image);
                Ok(())
            }
            Err(e) => {
                self.record_rejection(e.clone());
                Err(e)
            }
        }
    }

    /// Surface a rejected selection without touching state or image.
    pub fn record_rejection(&mut self, error: ValidationError) {
        warn!("request {} rejected image: {}", self.id, error);
        self.validation_error = Some(error);
        self.touch();
    }

    /// Install an already validated image. Supersedes any in-flight analysis.
    pub fn replace_image(&mut self, image: ImageAsset) {
        if matches!(self.state, AnalysisState::Analyzing { .. }) {
            info!(
                "request {} got a new image while analyzing; pending result will be discarded",
                self.id
            );
        }
        debug!(
            "request {} {} -> ready ({}, {} bytes)",
            self.id,
            self.state.name(),
            image.filename,
            image.size_bytes
        );
        self.generation += 1;
        self.validation_error = None;
        self.state = AnalysisState::Ready { image };
        self.touch();
    }

    pub fn begin_analysis(&mut self, engine: &str) -> Result<AnalysisTicket, PreconditionError> {
        let image = match &self.state {
            AnalysisState::Ready { image } => image.clone(),
            other => {
                let err = match other {
                    AnalysisState::Idle => PreconditionError::NoImage,
                    AnalysisState::Analyzing { .. } => PreconditionError::AlreadyAnalyzing,
                    _ => PreconditionError::WrongState {
                        action: "analyze",
                        state: other.name(),
                    },
                };
                warn!("request {} analyze rejected: {}", self.id, err);
                return Err(err);
            }
        };

        self.generation += 1;
        self.engine = Some(engine.to_string());
        self.state = AnalysisState::Analyzing {
            image: image.clone(),
            started_at: Utc::now(),
        };
        self.touch();
        debug!(
            "request {} ready -> analyzing (generation {}, engine {})",
            self.id, self.generation, engine
        );

        Ok(AnalysisTicket {
            request_id: self.id,
            kind: self.kind,
            generation: self.generation,
            image,
        })
    }

    /// Apply an engine outcome issued under `generation`.
    pub fn resolve(
        &mut self,
        generation: u64,
        outcome: Result<DiagnosticReport, EngineError>,
    ) -> Resolution {
        let (image, started_at) = match &self.state {
            AnalysisState::Analyzing { image, started_at } if generation == self.generation => {
                (image.clone(), *started_at)
            }
            _ => {
                info!(
                    "request {} dropped stale resolution (generation {}, current {}, state {})",
                    self.id,
                    generation,
                    self.generation,
                    self.state.name()
                );
                return Resolution::Stale;
            }
        };

        let outcome = outcome.and_then(|report| {
            if report.kind() == self.kind {
                Ok(report.normalized())
            } else {
                Err(EngineError::kind_mismatch(self.kind, report.kind()))
            }
        });

        self.touch();
        match outcome {
            Ok(report) => {
                debug!("request {} analyzing -> completed", self.id);
                self.state = AnalysisState::Completed {
                    image,
                    started_at,
                    report,
                };
                Resolution::Completed
            }
            Err(error) => {
                warn!("request {} analyzing -> failed: {}", self.id, error);
                self.state = AnalysisState::Failed {
                    image,
                    started_at,
                    error,
                };
                Resolution::Failed
            }
        }
    }

    /// Failed → Ready with the same image, so analysis can be triggered again.
    pub fn retry(&mut self) -> Result<(), PreconditionError> {
        match &self.state {
            AnalysisState::Failed { image, .. } => {
                let image = image.clone();
                debug!("request {} failed -> ready (retry)", self.id);
                self.state = AnalysisState::Ready { image };
                self.touch();
                Ok(())
            }
            other => Err(PreconditionError::WrongState {
                action: "retry",
                state: other.name(),
            }),
        }
    }

    /// Drop the image and any result; an in-flight analysis becomes stale.
    pub fn reset(&mut self) {
        debug!("request {} {} -> idle", self.id, self.state.name());
        self.generation += 1;
        self.validation_error = None;
        self.engine = None;
        self.state = AnalysisState::Idle;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn view(&self, include_data_uri: bool) -> RequestView {
        let panel = match &self.state {
            AnalysisState::Idle | AnalysisState::Ready { .. } => ResultsPanel::Empty,
            AnalysisState::Analyzing { .. } => ResultsPanel::Progress {
                message: match self.kind {
                    AnalysisKind::Pest => "Analyzing...".to_string(),
                    AnalysisKind::Soil => "Analyzing Soil...".to_string(),
                },
            },
            AnalysisState::Completed { report, .. } => ResultsPanel::Report {
                sections: render_report(report),
            },
            AnalysisState::Failed { error, .. } => ResultsPanel::Error {
                reason: error.reason,
                message: error.message.clone(),
                can_retry: true,
            },
        };

        RequestView {
            id: self.id,
            kind: self.kind,
            state: self.state.name(),
            can_analyze: self.can_analyze(),
            image: self.image().map(|i| i.summary(include_data_uri)),
            started_at: self.state.started_at(),
            engine: self.engine.clone(),
            panel,
            validation_error: self.validation_error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResultsPanel {
    Empty,
    Progress {
        message: String,
    },
    Report {
        sections: Vec<Section>,
    },
    Error {
        reason: EngineErrorReason,
        message: String,
        can_retry: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: Uuid,
    pub kind: AnalysisKind,
    pub state: &'static str,
    pub can_analyze: bool,
    pub image: Option<ImageSummary>,
    pub started_at: Option<DateTime<Utc>>,
    pub engine: Option<String>,
    pub panel: ResultsPanel,
    pub validation_error: Option<ValidationError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

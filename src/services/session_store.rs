// src/services/session_store.rs
use crate::errors::{AgriError, ValidationError};
use crate::models::{AnalysisKind, ImageUpload};
use crate::services::{AnalysisEngine, ImageProcessor};
use crate::workflow::{AnalysisRequest, RequestView, Resolution};
use chrono::Utc;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// In-memory home for the analysis requests of live screen sessions, plus the
/// glue that runs engine calls in the background and feeds results back.
pub struct SessionStore {
    requests: Arc<RwLock<HashMap<Uuid, AnalysisRequest>>>,
    engine: Arc<dyn AnalysisEngine>,
    image_processor: Arc<ImageProcessor>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(
        engine: Arc<dyn AnalysisEngine>,
        image_processor: Arc<ImageProcessor>,
        ttl: Duration,
    ) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            engine,
            image_processor,
            ttl,
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn image_processor(&self) -> &ImageProcessor {
        &self.image_processor
    }

    pub async fn create(&self, kind: AnalysisKind) -> RequestView {
        self.purge_expired().await;

        let request = AnalysisRequest::new(kind);
        let view = request.view(false);
        self.requests.write().await.insert(request.id(), request);
        info!("created {} analysis session {}", kind.as_str(), view.id);
        view
    }

    pub async fn view(&self, id: Uuid, include_data_uri: bool) -> Result<RequestView, AgriError> {
        let requests = self.requests.read().await;
        let request = requests.get(&id).ok_or(AgriError::SessionNotFound(id))?;
        Ok(request.view(include_data_uri))
    }

    pub async fn select_image(&self, id: Uuid, upload: ImageUpload) -> Result<RequestView, AgriError> {
        let mut requests = self.requests.write().await;
        let request = requests.get_mut(&id).ok_or(AgriError::SessionNotFound(id))?;
        request.select_image(&self.image_processor, upload)?;
        Ok(request.view(false))
    }

    /// Record an upload that was refused before it reached `select_image`.
    pub async fn reject_upload(
        &self,
        id: Uuid,
        error: ValidationError,
    ) -> Result<(), AgriError> {
        let mut requests = self.requests.write().await;
        let request = requests.get_mut(&id).ok_or(AgriError::SessionNotFound(id))?;
        request.record_rejection(error);
        Ok(())
    }

    /// Start analysis and return immediately. The handle resolves once the
    /// engine outcome has been applied (or dropped as stale).
    pub async fn trigger(
        &self,
        id: Uuid,
    ) -> Result<(RequestView, JoinHandle<Resolution>), AgriError> {
        let (ticket, view) = {
            let mut requests = self.requests.write().await;
            let request = requests.get_mut(&id).ok_or(AgriError::SessionNotFound(id))?;
            let ticket = request.begin_analysis(self.engine.name())?;
            (ticket, request.view(false))
        };

        let requests = Arc::clone(&self.requests);
        let engine = Arc::clone(&self.engine);

        let handle = tokio::spawn(async move {
            let outcome = engine.analyze(&ticket.image, ticket.kind).await;

            let mut requests = requests.write().await;
            match requests.get_mut(&ticket.request_id) {
                Some(request) => request.resolve(ticket.generation, outcome),
                None => {
                    debug!(
                        "session {} closed before analysis finished",
                        ticket.request_id
                    );
                    Resolution::Stale
                }
            }
        });

        Ok((view, handle))
    }

    pub async fn retry(&self, id: Uuid) -> Result<RequestView, AgriError> {
        let mut requests = self.requests.write().await;
        let request = requests.get_mut(&id).ok_or(AgriError::SessionNotFound(id))?;
        request.retry()?;
        Ok(request.view(false))
    }

    pub async fn reset(&self, id: Uuid) -> Result<RequestView, AgriError> {
        let mut requests = self.requests.write().await;
        let request = requests.get_mut(&id).ok_or(AgriError::SessionNotFound(id))?;
        request.reset();
        Ok(request.view(false))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AgriError> {
        self.requests
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AgriError::SessionNotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Drop sessions untouched for longer than the TTL.
    pub async fn purge_expired(&self) -> usize {
        let ttl = chrono::Duration::from_std(self.ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let cutoff = Utc::now() - ttl;

        let mut requests = self.requests.write().await;
        let before = requests.len();
        requests.retain(|_, request| request.updated_at() >= cutoff);
        let purged = before - requests.len();
        if purged > 0 {
            info!("purged {} idle analysis sessions", purged);
        }
        purged
    }
}

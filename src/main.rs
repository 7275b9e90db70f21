// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod errors;
mod handlers;
mod models;
mod render;
mod screens;
mod services;
mod workflow;

use crate::config::Settings;
use crate::errors::AgriError;
use crate::handlers::{
    analyze, clear_image, create_analysis, crop_calendar, delete_analysis, get_analysis,
    market_prices, retry_analysis, upload_image, weather_report,
};
use crate::services::{ImageProcessor, SessionStore, build_engine};

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting AgriSense service...");

    let settings = Settings::load()?;

    // Initialize services
    let image_processor = Arc::new(ImageProcessor::new(&settings.analysis));
    let engine = build_engine(&settings.engine, Arc::clone(&image_processor))?;
    info!("Using {} analysis engine", engine.name());

    let sessions = Arc::new(SessionStore::new(
        engine,
        image_processor,
        Duration::from_secs(settings.analysis.session_ttl_secs),
    ));

    let app_state = AppState { sessions };

    let (host, port) = settings.bind_address();
    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes)
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}

/// Extractor failures (bad body, query or path) answer with the same JSON error body.
fn bad_request(message: String) -> actix_web::Error {
    AgriError::BadRequest(message).into()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| bad_request(err.to_string())))
        .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request(err.to_string())))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_request(err.to_string())));

    cfg.service(
        web::scope("/api/v1")
            .route("/analyses", web::post().to(create_analysis))
            .route("/analyses/{id}", web::get().to(get_analysis))
            .route("/analyses/{id}", web::delete().to(delete_analysis))
            .route("/analyses/{id}/image", web::post().to(upload_image))
            .route("/analyses/{id}/image", web::delete().to(clear_image))
            .route("/analyses/{id}/analyze", web::post().to(analyze))
            .route("/analyses/{id}/retry", web::post().to(retry_analysis))
            .route("/calendar", web::get().to(crop_calendar))
            .route("/market-prices", web::get().to(market_prices))
            .route("/weather", web::get().to(weather_report)),
    )
    .route("/health", web::get().to(health_check));
}

async fn health_check(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "agrisense",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": data.sessions.engine_name(),
        "sessions": data.sessions.len().await
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockEngine;
    use actix_web::test;

    #[actix_web::test]
    async fn health_reports_engine() {
        let settings = Settings::defaults().unwrap();
        let state = AppState {
            sessions: Arc::new(SessionStore::new(
                Arc::new(MockEngine::new(Duration::ZERO)),
                Arc::new(ImageProcessor::new(&settings.analysis)),
                Duration::from_secs(60),
            )),
        };
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["engine"], "mock");
        assert_eq!(body["sessions"], 0);
    }
}

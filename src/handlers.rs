// src/handlers.rs
use crate::errors::{AgriError, ValidationError};
use crate::models::{AnalysisKind, ImageUpload};
use crate::screens::{calendar, market, weather};
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::{Bytes, BytesMut};
use chrono::Datelike;
use futures_util::{Stream, TryStreamExt};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateAnalysis {
    pub kind: AnalysisKind,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub include_image: bool,
}

pub async fn create_analysis(
    body: web::Json<CreateAnalysis>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let view = data.sessions.create(body.kind).await;
    Ok(HttpResponse::Created().json(view))
}

pub async fn get_analysis(
    path: web::Path<Uuid>,
    query: web::Query<ViewQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let view = data
        .sessions
        .view(path.into_inner(), query.include_image)
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Takes the first file field of a multipart body as the selected image.
pub async fn upload_image(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let max_bytes = data.sessions.image_processor().max_bytes();

    while let Some(mut field) = payload.try_next().await? {
        let Some(filename) = field
            .content_disposition()
            .get_filename()
            .map(|f| f.to_string())
        else {
            continue;
        };

        let content_type = field.content_type().map(|ct| ct.essence_str().to_string());

        let image_data = match read_capped(&mut field, max_bytes).await? {
            FieldBody::Complete(body) => body,
            FieldBody::Exceeded(size_bytes) => {
                let rejection = ValidationError::TooLarge {
                    size_bytes,
                    max_bytes,
                };
                data.sessions.reject_upload(id, rejection.clone()).await?;
                return Err(AgriError::Validation(rejection).into());
            }
        };

        let upload = ImageUpload {
            filename,
            content_type,
            data: image_data,
        };
        let view = data.sessions.select_image(id, upload).await?;
        return Ok(HttpResponse::Ok().json(view));
    }

    Err(AgriError::BadRequest("No file field in upload".to_string()).into())
}

#[derive(Debug, PartialEq)]
pub(crate) enum FieldBody {
    Complete(Bytes),
    /// Reading stopped after this many bytes, past the limit.
    Exceeded(usize),
}

/// Buffer a field body, giving up as soon as it grows past `max_bytes`.
pub(crate) async fn read_capped<S, E>(stream: &mut S, max_bytes: usize) -> Result<FieldBody, E>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.try_next().await? {
        if buf.len() + chunk.len() > max_bytes {
            return Ok(FieldBody::Exceeded(buf.len() + chunk.len()));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(FieldBody::Complete(buf.freeze()))
}

pub async fn analyze(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    // the background task applies the result; the handle is not needed here
    let (view, _handle) = data.sessions.trigger(path.into_inner()).await?;
    Ok(HttpResponse::Accepted().json(view))
}

pub async fn retry_analysis(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let view = data.sessions.retry(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn clear_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let view = data.sessions.reset(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn delete_analysis(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.sessions.remove(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub month: Option<String>,
    pub year: Option<i32>,
}

pub async fn crop_calendar(query: web::Query<CalendarQuery>) -> Result<HttpResponse, Error> {
    let today = chrono::Utc::now().date_naive();
    let month = match query.month.as_deref() {
        Some(raw) => calendar::parse_month(raw)?,
        None => today.month0() as usize,
    };
    let year = query.year.unwrap_or_else(|| today.year());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "month": calendar::MONTH_NAMES[month],
        "year": year,
        "sections": calendar::render(month, year)
    })))
}

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    #[serde(default)]
    pub crop: String,
    pub location: Option<String>,
}

pub async fn market_prices(query: web::Query<MarketQuery>) -> Result<HttpResponse, Error> {
    let location = market::location_name(query.location.as_deref().unwrap_or("delhi"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "location": location,
        "locations": market::LOCATIONS
            .iter()
            .map(|(id, name)| serde_json::json!({ "id": id, "name": name }))
            .collect::<Vec<_>>(),
        "sections": market::render(&query.crop, location)
    })))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

pub async fn weather_report(query: web::Query<WeatherQuery>) -> Result<HttpResponse, Error> {
    let location = query
        .location
        .clone()
        .unwrap_or_else(|| weather::DEFAULT_LOCATION.to_string());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "location": location,
        "sections": weather::render(&location)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::image_processor::test_images::padded_jpeg;
    use crate::services::{ImageProcessor, MockEngine, SessionStore};
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;
    use std::time::Duration;

    const BOUNDARY: &str = "----agrisense-test-boundary";

    fn state(max_image_bytes: usize) -> AppState {
        let mut settings = Settings::defaults().unwrap();
        settings.analysis.max_image_bytes = max_image_bytes;
        let processor = Arc::new(ImageProcessor::new(&settings.analysis));
        AppState {
            sessions: Arc::new(SessionStore::new(
                Arc::new(MockEngine::new(Duration::from_millis(1))),
                processor,
                Duration::from_secs(60),
            )),
        }
    }

    fn multipart_body(filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(id: Uuid, filename: &str, content_type: &str, data: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri(&format!("/api/v1/analyses/{id}/image"))
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body(filename, content_type, data))
    }

    #[actix_web::test]
    async fn pest_analysis_over_http() {
        let app_state = state(10 * 1024 * 1024);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .configure(crate::routes),
        )
        .await;

        let created: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/analyses")
                .set_json(serde_json::json!({ "kind": "pest" }))
                .to_request(),
        )
        .await;
        assert_eq!(created["state"], "idle");
        assert_eq!(created["can_analyze"], false);
        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();

        let ready: serde_json::Value = test::call_and_read_body_json(
            &app,
            upload_request(id, "leaf.jpg", "image/jpeg", &padded_jpeg(2 * 1024 * 1024))
                .to_request(),
        )
        .await;
        assert_eq!(ready["state"], "ready");
        assert_eq!(ready["can_analyze"], true);
        assert_eq!(ready["panel"]["mode"], "empty");

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/analyses/{id}/analyze"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let again = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/analyses/{id}/analyze"))
                .to_request(),
        )
        .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let mut view = serde_json::Value::Null;
        for _ in 0..200 {
            view = test::call_and_read_body_json(
                &app,
                test::TestRequest::get()
                    .uri(&format!("/api/v1/analyses/{id}"))
                    .to_request(),
            )
            .await;
            if view["state"] == "completed" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(view["state"], "completed");
        let summary = &view["panel"]["sections"][0];
        assert_eq!(summary["type"], "summary");
        assert_eq!(summary["headline"], "Aphids");
        assert!(summary.to_string().contains("92"));
    }

    #[actix_web::test]
    async fn text_upload_is_rejected_and_state_kept() {
        let app_state = state(10 * 1024 * 1024);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .configure(crate::routes),
        )
        .await;
        let id = app_state.sessions.create(AnalysisKind::Soil).await.id;

        let resp = test::call_service(
            &app,
            upload_request(id, "notes.txt", "text/plain", b"just words").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let view = app_state.sessions.view(id, false).await.unwrap();
        assert_eq!(view.state, "idle");
        assert!(view.image.is_none());
        assert!(view.validation_error.is_some());
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected_at_limit() {
        let app_state = state(1024);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(app_state.clone()))
                .configure(crate::routes),
        )
        .await;
        let id = app_state.sessions.create(AnalysisKind::Pest).await.id;

        let resp = test::call_service(
            &app,
            upload_request(id, "big.jpg", "image/jpeg", &padded_jpeg(64 * 1024)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let view = app_state.sessions.view(id, false).await.unwrap();
        assert_eq!(view.state, "idle");
        match view.validation_error {
            Some(ValidationError::TooLarge {
                size_bytes,
                max_bytes: 1024,
            }) => assert!(size_bytes > 1024 && size_bytes <= 64 * 1024),
            other => panic!("expected too_large, got {other:?}"),
        }
    }

    #[actix_web::test]
    async fn capped_read_stops_at_first_chunk_over_limit() {
        let chunks: Vec<Result<Bytes, &str>> = vec![
            Ok(Bytes::from(vec![1u8; 600])),
            Ok(Bytes::from(vec![2u8; 600])),
            Err("read past the limit"),
        ];
        let mut stream = futures_util::stream::iter(chunks);
        assert_eq!(
            read_capped(&mut stream, 1024).await,
            Ok(FieldBody::Exceeded(1200))
        );

        let mut small = futures_util::stream::iter(vec![
            Ok::<_, &str>(Bytes::from_static(b"abc")),
            Ok(Bytes::from_static(b"def")),
        ]);
        assert_eq!(
            read_capped(&mut small, 6).await,
            Ok(FieldBody::Complete(Bytes::from_static(b"abcdef")))
        );
    }

    #[actix_web::test]
    async fn extractor_failures_answer_with_json_errors() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(1024)))
                .configure(crate::routes),
        )
        .await;

        let requests = [
            test::TestRequest::post()
                .uri("/api/v1/analyses")
                .set_json(serde_json::json!({ "kind": "fish" })),
            test::TestRequest::get().uri("/api/v1/analyses/not-a-uuid"),
            test::TestRequest::get().uri("/api/v1/calendar?year=abc"),
        ];

        for req in requests {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: serde_json::Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Bad request");
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[actix_web::test]
    async fn unknown_session_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(1024)))
                .configure(crate::routes),
        )
        .await;
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/analyses/{}", Uuid::new_v4()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn static_screens_render_sections() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(1024)))
                .configure(crate::routes),
        )
        .await;

        let calendar: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/calendar?month=february&year=2025")
                .to_request(),
        )
        .await;
        assert_eq!(calendar["month"], "February");
        assert_eq!(calendar["sections"][0]["cards"].as_array().unwrap().len(), 3);

        let market: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/market-prices?crop=whe&location=mumbai")
                .to_request(),
        )
        .await;
        assert_eq!(market["location"], "Mumbai");
        assert_eq!(market["sections"][0]["cards"][0]["title"], "Wheat");

        let bad = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/market-prices?location=atlantis")
                .to_request(),
        )
        .await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let weather: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/weather").to_request(),
        )
        .await;
        assert_eq!(weather["location"], "New Delhi, India");
        assert_eq!(weather["sections"][2]["type"], "list");
    }
}

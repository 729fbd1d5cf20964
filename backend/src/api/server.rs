//! HTTP Server for the EPP export API.
//!
//! Provides REST endpoints for order upload, preview and export.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                          |
//! |--------|----------------|--------------------------------------|
//! | GET    | `/health`      | Health check                         |
//! | POST   | `/api/preview` | Upload order, get the preview table  |
//! | POST   | `/api/export`  | Upload order, download the EPP file  |
//! | GET    | `/api/logs`    | SSE stream for real-time logs        |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, parse_flag, PreviewResponse};
use crate::config::{ReferenceData, MAX_UPLOAD_SIZE};
use crate::error::ServerError;
use crate::models::{DocumentType, ExportOptions};
use crate::transform::pipeline::{run, PipelineOutput};

const TOTAL_WEIGHT_HEADER: HeaderName = HeaderName::from_static("x-total-weight-kg");

type AppState = Arc<ReferenceData>;
type ApiError = (StatusCode, Json<Value>);

/// Start the HTTP server
pub async fn start_server(reference: ReferenceData, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION, TOTAL_WEIGHT_HEADER]);

    let app = router(Arc::new(reference)).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 EPP export server running on http://localhost:{}", port);
    println!("   POST /api/preview - Upload order, JSON preview");
    println!("   POST /api/export  - Upload order, EPP download");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/preview", post(preview))
        .route("/api/export", post(export_file))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(reference): State<AppState>) -> Json<Value> {
    let templates: Vec<&str> = DocumentType::ALL
        .iter()
        .filter(|dt| reference.templates.contains(**dt))
        .map(|dt| dt.code())
        .collect();

    Json(json!({
        "status": "ok",
        "service": "eppgen",
        "version": env!("CARGO_PKG_VERSION"),
        "catalogEntries": reference.catalog.len(),
        "templates": templates,
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload an order and return the preview table
async fn preview(
    State(reference): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PreviewResponse>, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    let document_type = upload.options.document_type;
    let output = process(reference, upload).await.map_err(reject)?;

    Ok(Json(PreviewResponse::new(document_type, output)))
}

/// Upload an order and download the EPP file
async fn export_file(
    State(reference): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart).await.map_err(reject)?;
    let output = process(reference, upload).await.map_err(reject)?;

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=windows-1250".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                ascii_filename(&output.export.suggested_filename)
            ),
        ),
        (TOTAL_WEIGHT_HEADER, format!("{:.2}", output.export.total_weight_kg)),
    ];

    Ok((headers, output.bytes))
}

struct Upload {
    bytes: Vec<u8>,
    file_name: Option<String>,
    options: ExportOptions,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload, ServerError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = ExportOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "documentType" | "label" | "roundToPackages" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                apply_option(&mut options, &name, &value)?;
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    Ok(Upload {
        bytes,
        file_name,
        options,
    })
}

fn apply_option(options: &mut ExportOptions, name: &str, value: &str) -> Result<(), ServerError> {
    match name {
        "documentType" => {
            if !value.trim().is_empty() {
                options.document_type = value.parse().map_err(ServerError::BadRequest)?;
            }
        }
        "label" => options.label = value.to_string(),
        "roundToPackages" => {
            options.round_to_packages = parse_flag(value).ok_or_else(|| {
                ServerError::BadRequest(format!("roundToPackages: '{}' is not a boolean", value))
            })?;
        }
        _ => {}
    }
    Ok(())
}

/// Run the pipeline off the async runtime.
async fn process(reference: AppState, upload: Upload) -> Result<PipelineOutput, ServerError> {
    println!("\n{}", "=".repeat(70));
    println!(
        "📄 NEW UPLOAD: {} ({} bytes, {})",
        upload.file_name.as_deref().unwrap_or("unknown"),
        upload.bytes.len(),
        upload.options.document_type
    );
    println!("{}\n", "=".repeat(70));

    tokio::task::spawn_blocking(move || {
        let now = reference.now();
        run(
            &reference,
            &upload.bytes,
            upload.file_name.as_deref(),
            &upload.options,
            now,
        )
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))?
    .map_err(ServerError::from)
}

/// Map an error to its status code and JSON body.
fn reject(err: ServerError) -> ApiError {
    log_error(err.to_string());
    let (status, kind) = match &err {
        ServerError::Pipeline(e) if e.is_client_error() => (StatusCode::UNPROCESSABLE_ENTITY, e.kind()),
        ServerError::Pipeline(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.kind()),
        ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    (status, Json(error_response(kind, &err.to_string())))
}

/// Header-safe filename: non-ASCII and quoting characters become `_`.
fn ascii_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OrderError, PipelineError};

    #[test]
    fn test_ascii_filename() {
        assert_eq!(
            ascii_filename("ZK_Łódź_20240102_030405.epp"),
            "ZK___d__20240102_030405.epp"
        );
        assert_eq!(ascii_filename("MM_a\"b.epp"), "MM_a_b.epp");
    }

    #[test]
    fn test_apply_option() {
        let mut options = ExportOptions::default();
        apply_option(&mut options, "documentType", "mm").unwrap();
        apply_option(&mut options, "roundToPackages", "tak").unwrap();
        apply_option(&mut options, "label", "Sklep 5").unwrap();
        assert_eq!(options.document_type, DocumentType::Mm);
        assert!(options.round_to_packages);
        assert_eq!(options.label, "Sklep 5");

        assert!(matches!(
            apply_option(&mut options, "documentType", "WZ"),
            Err(ServerError::BadRequest(_))
        ));
        assert!(apply_option(&mut options, "roundToPackages", "perhaps").is_err());
    }

    #[test]
    fn test_reject_status_mapping() {
        let (status, body) = reject(ServerError::Pipeline(PipelineError::Order(OrderError::EmptyOrder)));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.0["kind"], "empty_order");

        let (status, body) = reject(ServerError::BadRequest("No file provided".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.0["kind"], "bad_request");
    }
}

//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload` | Multipart `file` (+ optional `namespace`); index a PDF |
//! | `POST` | `/query` | `{message, namespace, topK?, temperature?}`; answer a question |
//! | `GET`  | `/namespaces/{namespace}/stats` | Vector count for a namespace |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "empty_document", "message": "document contains no extractable text" } }
//! ```
//!
//! | Status | Codes |
//! |--------|-------|
//! | 400 | `bad_request`, `invalid_multipart` |
//! | 413 | `payload_too_large` |
//! | 422 | `empty_document`, `no_chunks_produced`, `extraction_failed` |
//! | 500 | `invalid_chunking`, `dimension_mismatch`, `configuration` |
//! | 502 | `embedding_provider`, `generation_provider`, `vector_store` |
//! | 504 | `provisioning_timeout` |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! on another origin can call the API.

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pdf_rag_core::error::ErrorCategory;
use pdf_rag_core::models::{Answer, IngestReport};
use pdf_rag_core::store::NamespaceStats;
use pdf_rag_core::RagError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::pipeline::{PdfUpload, PipelineContext, QueryOverrides};

/// Headroom for multipart boundaries and the namespace field.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<PipelineContext>,
    max_upload_bytes: usize,
}

/// Build the router without binding a socket.
pub fn router(pipeline: Arc<PipelineContext>, max_upload_bytes: usize) -> Router {
    let state = AppState {
        pipeline,
        max_upload_bytes,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(handle_upload))
        .route("/query", post(handle_query))
        .route("/namespaces/{namespace}/stats", get(handle_namespace_stats))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD))
        .layer(cors)
        .with_state(state)
}

/// Connect the pipeline described by `config` and serve until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Arc::new(PipelineContext::connect(config).await?);
    run_server_with_pipeline(&config.server.bind, pipeline, config.server.max_upload_bytes).await
}

/// Serve an already-connected pipeline on `bind_addr`.
pub async fn run_server_with_pipeline(
    bind_addr: &str,
    pipeline: Arc<PipelineContext>,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let app = router(pipeline, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "server listening");
    println!("pdf-rag server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn payload_too_large(limit: usize) -> AppError {
    AppError {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        code: "payload_too_large".to_string(),
        message: format!("file exceeds the {} byte upload limit", limit),
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        AppError {
            status,
            code: if status == StatusCode::PAYLOAD_TOO_LARGE {
                "payload_too_large".to_string()
            } else {
                "invalid_multipart".to_string()
            },
            message: err.body_text(),
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let status = match err.category() {
            ErrorCategory::BadInput => match err {
                RagError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
            ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        };
        if status.is_server_error() {
            error!(code = err.code(), error = %err, "request failed");
        } else {
            warn!(code = err.code(), error = %err, "request rejected");
        }
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /upload ============

/// Reads the `file` and `namespace` fields; other fields are ignored.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>, AppError> {
    let mut upload = PdfUpload::default();
    let mut saw_file = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if bytes.len() > state.max_upload_bytes {
                    return Err(payload_too_large(state.max_upload_bytes));
                }
                upload.bytes = bytes.to_vec();
                saw_file = true;
            }
            Some("namespace") => {
                upload.namespace = Some(field.text().await?);
            }
            _ => {}
        }
    }

    if !saw_file {
        return Err(bad_request("multipart field 'file' is required"));
    }

    let report = state.pipeline.ingest_pdf(upload).await?;
    Ok(Json(report))
}

// ============ POST /query ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    temperature: Option<f32>,
}

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let Json(req) = body.map_err(|rejection| bad_request(rejection.body_text()))?;
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    if req.namespace.trim().is_empty() {
        return Err(bad_request("namespace must not be empty"));
    }
    if req.top_k == Some(0) {
        return Err(bad_request("topK must be >= 1"));
    }

    let overrides = QueryOverrides {
        top_k: req.top_k,
        temperature: req.temperature,
    };
    let answer = state
        .pipeline
        .answer(&req.message, &req.namespace, &overrides)
        .await?;
    Ok(Json(answer))
}

// ============ GET /namespaces/{namespace}/stats ============

async fn handle_namespace_stats(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Json<NamespaceStats>, AppError> {
    let stats = state.pipeline.namespace_stats(&namespace).await?;
    Ok(Json(stats))
}

//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for document upload, question answering,
//! structured extraction and document management.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::TmsError;
use crate::extraction::ShipmentData;
use crate::orchestrator::Orchestrator;
use crate::rag::{ConfidenceCategory, Source};
use crate::vector_store::DocumentRecord;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Allowance for multipart framing on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let state = Arc::new(AppState { orchestrator });

    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);

    Output::header("TMS AI API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Upload", "POST   /upload");
    Output::kv("Ask", "POST   /ask");
    Output::kv("Extract", "POST   /extract?document_id=...");
    Output::kv("List", "GET    /documents");
    Output::kv("Delete", "DELETE /document/{document_id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.orchestrator.settings().upload.max_file_size + MULTIPART_OVERHEAD;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/upload", post(upload).layer(DefaultBodyLimit::max(body_limit)))
        .route("/ask", post(ask))
        .route("/extract", post(extract))
        .route("/documents", get(list_documents))
        .route("/document/{document_id}", delete(delete_document))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    document_id: String,
    filename: String,
    message: String,
    num_chunks: usize,
}

#[derive(Deserialize)]
struct AskRequest {
    document_id: String,
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    success: bool,
    answer: String,
    confidence_score: f32,
    confidence_category: ConfidenceCategory,
    sources: Vec<Source>,
    passes_guardrails: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ExtractQuery {
    document_id: String,
}

#[derive(Serialize)]
struct ExtractResponse {
    success: bool,
    document_id: String,
    shipment_data: ShipmentData,
    message: String,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentRecord>,
    total: usize,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
}

/// Error returned by handlers.
struct ApiError(TmsError);

impl From<TmsError> for ApiError {
    fn from(err: TmsError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            TmsError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            TmsError::UnsupportedFileType(_)
            | TmsError::FileTooLarge { .. }
            | TmsError::InvalidInput(_)
            | TmsError::DocumentParse { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = ErrorResponse {
            success: false,
            error: self.0.kind().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "TMS AI Document Processing API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "/upload",
            "ask": "/ask",
            "extract": "/extract",
            "documents": "/documents",
            "delete": "/document/{document_id}",
        },
        "status": "operational",
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TmsError::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| TmsError::InvalidInput("Uploaded file has no filename".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| TmsError::InvalidInput(format!("Failed to read file: {}", e)))?;

        info!("Processing upload: {} ({} bytes)", filename, data.len());

        let result = state.orchestrator.ingest(&filename, data.to_vec()).await?;

        return Ok(Json(UploadResponse {
            success: true,
            document_id: result.document_id,
            filename: result.filename,
            message: "Document uploaded and processed successfully".to_string(),
            num_chunks: result.num_chunks,
        }));
    }

    Err(TmsError::InvalidInput("Missing multipart field 'file'".to_string()).into())
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let answer = state.orchestrator.ask(&req.document_id, &req.question).await?;

    let message = (!answer.passes_guardrails)
        .then(|| "Answer did not pass confidence guardrails".to_string());

    Ok(Json(AskResponse {
        success: true,
        answer: answer.answer,
        confidence_score: answer.confidence_score,
        confidence_category: answer.confidence_category,
        sources: answer.sources,
        passes_guardrails: answer.passes_guardrails,
        message,
    }))
}

async fn extract(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExtractQuery>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let shipment_data = state.orchestrator.extract(&query.document_id).await?;

    Ok(Json(ExtractResponse {
        success: true,
        document_id: query.document_id,
        shipment_data,
        message: "Structured data extracted successfully".to_string(),
    }))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state.orchestrator.list_documents().await?;
    let total = documents.len();
    Ok(Json(DocumentListResponse { documents, total }))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.orchestrator.delete(&document_id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "Document deleted successfully".to_string(),
    }))
}

//! JSON HTTP API server.
//!
//! Exposes the document pipeline and the question-answering flow over
//! HTTP so a dashboard or another service can drive stratdesk without the
//! CLI.
//!
//! # Endpoints
//!
//! | Method   | Path                  | Description |
//! |----------|-----------------------|-------------|
//! | `GET`    | `/`                   | Service name and version |
//! | `GET`    | `/health`             | Health check |
//! | `POST`   | `/api/documents`      | Upload a document (base64 body) |
//! | `GET`    | `/api/documents`      | List documents |
//! | `DELETE` | `/api/documents/{id}` | Delete a document and its vectors |
//! | `POST`   | `/api/query`          | Ask a question |
//! | `GET`    | `/api/history`        | Recent queries (`?limit=`) |
//! | `GET`    | `/api/stats`          | System statistics |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "unsupported file format: .csv" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! dashboards.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::generate_answer;
use crate::completion::{self, CompletionProvider};
use crate::config::Config;
use crate::db;
use crate::docs;
use crate::embedding::{self, EmbeddingProvider};
use crate::history;
use crate::ingest::{ingest_bytes, resolve_doc_type};
use crate::models::DocumentType;
use crate::stats::collect_stats;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    pool: SqlitePool,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
}

/// Starts the HTTP API server.
///
/// Binds to `[server].bind` and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();

    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let completer: Arc<dyn CompletionProvider> =
        Arc::from(completion::create_provider(&config.completion)?);

    let pool = db::connect(config).await?;

    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
        embedder,
        completer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/documents", post(handle_upload).get(handle_list_documents))
        .route("/api/documents/{id}", delete(handle_delete_document))
        .route("/api/query", post(handle_query))
        .route("/api/history", get(handle_history))
        .route("/api/stats", get(handle_stats))
        .layer(cors)
        .with_state(state);

    println!("API server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
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

/// Internal error type that converts into an HTTP response.
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps pipeline errors onto the most appropriate HTTP status. Validation
/// failures (bad format, unknown type, nothing extracted) are the client's
/// fault; everything else is a 500.
fn classify_error(err: anyhow::Error) -> AppError {
    let chain = format!("{:#}", err);

    if chain.contains("No document with id") {
        not_found(chain)
    } else if chain.contains("unsupported file format")
        || chain.contains("Unknown document type")
        || chain.contains("no text could be extracted")
        || chain.contains("invalid")
    {
        bad_request(chain)
    } else {
        internal(chain)
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct ServiceInfo {
    service: String,
    version: String,
}

async fn handle_root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "stratdesk".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

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

// ============ POST /api/documents ============

#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    /// File bytes, base64 (standard alphabet with padding).
    content_base64: String,
    /// Optional type override; `"auto"` or absent classifies from content.
    document_type: Option<String>,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.filename.trim().is_empty() {
        return Err(bad_request("filename must not be empty"));
    }

    let bytes = STANDARD
        .decode(req.content_base64.as_bytes())
        .map_err(|e| bad_request(format!("invalid base64 content: {}", e)))?;

    let override_type = match req.document_type.as_deref() {
        None => None,
        Some(value) => resolve_doc_type(value).map_err(classify_error)?,
    };

    let report = ingest_bytes(
        &state.pool,
        &state.config,
        state.embedder.as_ref(),
        &req.filename,
        &bytes,
        override_type,
    )
    .await
    .map_err(classify_error)?;

    Ok(Json(serde_json::json!({ "document": report })))
}

// ============ GET /api/documents ============

async fn handle_list_documents(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let documents = docs::list_documents(&state.pool)
        .await
        .map_err(classify_error)?;

    let items: Vec<serde_json::Value> = documents
        .iter()
        .map(|d| {
            serde_json::json!({
                "id": d.id,
                "filename": d.filename,
                "document_type": d.document_type.as_str(),
                "word_count": d.word_count,
                "character_count": d.character_count,
                "embedding_status": d.embedding_status,
                "uploaded_at": d.uploaded_at,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "documents": items })))
}

// ============ DELETE /api/documents/{id} ============

async fn handle_delete_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    docs::delete_document(&state.pool, id)
        .await
        .map_err(classify_error)?;

    Ok(Json(serde_json::json!({ "deleted": id })))
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    /// Optional type filter; absent or `"all"` searches every document.
    document_type: Option<String>,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let type_filter = match req.document_type.as_deref() {
        None | Some("all") => None,
        Some(value) => match DocumentType::parse(value) {
            Some(ty) => Some(ty),
            None => {
                return Err(bad_request(format!(
                    "Unknown document type filter: '{}'",
                    value
                )))
            }
        },
    };

    let answer = generate_answer(
        &state.pool,
        &state.config,
        state.embedder.as_ref(),
        state.completer.as_ref(),
        &req.query,
        type_filter,
    )
    .await;

    if let Err(e) = history::record_query(&state.pool, &req.query, &answer).await {
        eprintln!("Warning: failed to record query history: {}", e);
    }

    Ok(Json(serde_json::json!({ "answer": answer })))
}

// ============ GET /api/history ============

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 500);
    let entries = history::list_history(&state.pool, limit)
        .await
        .map_err(classify_error)?;

    Ok(Json(serde_json::json!({ "queries": entries })))
}

// ============ GET /api/stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let stats = collect_stats(&state.pool).await.map_err(classify_error)?;
    Ok(Json(serde_json::json!({ "stats": stats })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_classified() {
        let e = classify_error(anyhow::anyhow!("No document with id 7"));
        assert_eq!(e.status, StatusCode::NOT_FOUND);
        assert_eq!(e.code, "not_found");
    }

    #[test]
    fn validation_errors_are_bad_request() {
        let e = classify_error(anyhow::anyhow!("unsupported file format: .csv"));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        let e = classify_error(anyhow::anyhow!("Unknown document type: 'memo'"));
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_errors_are_internal() {
        let e = classify_error(anyhow::anyhow!("database is locked"));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code, "internal");
    }
}

//! HTTP surface for Rusty Classify.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /classify_files` – Multipart upload (repeated `files` field). Files with an allowed
//!   extension are classified; the rest are reported as `skipped - invalid file type`. Returns
//!   `{ "results": { "<filename>": "<category or error>" } }`.
//! - `GET /metrics` – Observe classification counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::classification::{ClassificationApi, FileUpload, RenderedResults};
use crate::config::get_config;
use crate::metrics::MetricsSnapshot;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result string reported for uploads whose extension is not accepted.
pub const SKIPPED_RESULT: &str = "skipped - invalid file type";

/// Build the HTTP router exposing the classification API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ClassificationApi + 'static,
{
    let max_upload_bytes = get_config().max_upload_bytes;
    Router::new()
        .route(
            "/classify_files",
            post(classify_files::<S>).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Whether `filename` carries one of the `allowed` extensions (compared case-insensitively).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_lowercase())
        .is_some_and(|extension| allowed.iter().any(|candidate| *candidate == extension))
}

/// Success response for `POST /classify_files`.
#[derive(Serialize)]
struct ClassifyResponse {
    results: BTreeMap<String, String>,
}

/// Classify uploaded files.
///
/// Rejects the request when no `files` field is present, when more than
/// `MAX_FILES_PER_REQUEST` files are sent, or when no file has an allowed extension.
async fn classify_files<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<ClassifyResponse>, AppError>
where
    S: ClassificationApi,
{
    let config = get_config();
    let mut uploads: Vec<FileUpload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(format!("Failed to read multipart field: {error}")))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|error| {
            AppError::bad_request(format!("Failed to read file {filename}: {error}"))
        })?;
        uploads.push(FileUpload::new(filename, bytes.to_vec()));
    }

    if uploads.is_empty() {
        return Err(AppError::bad_request("No files part in the request"));
    }
    if uploads.len() > config.max_files_per_request {
        return Err(AppError::bad_request(format!(
            "Too many files. Maximum allowed is {}",
            config.max_files_per_request
        )));
    }
    if uploads.iter().all(|upload| upload.filename.is_empty()) {
        return Err(AppError::bad_request("No selected files"));
    }

    let (valid, skipped): (Vec<FileUpload>, Vec<FileUpload>) = uploads
        .into_iter()
        .filter(|upload| !upload.filename.is_empty())
        .partition(|upload| allowed_file(&upload.filename, &config.allowed_extensions));

    if valid.is_empty() {
        return Err(AppError::bad_request("No valid files to classify"));
    }

    let submitted = valid.len();
    let classified = service.classify_uploads(valid).await;
    let mut results = RenderedResults::new(&classified, service.unknown_label()).into_strings();
    for upload in &skipped {
        results.insert(upload.filename.clone(), SKIPPED_RESULT.to_string());
    }

    tracing::info!(
        submitted,
        skipped = skipped.len(),
        "Classify request completed"
    );
    Ok(Json(ClassifyResponse { results }))
}

/// Return the classification counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ClassificationApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "classify_files",
                method: "POST",
                path: "/classify_files",
                description: "Upload files as multipart `files` fields and classify each into the configured categories. Response returns { \"results\": { filename: category } }.",
                request_example: Some(json!({
                    "files": ["invoice.pdf", "licence.jpg", "notes.txt"]
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return classification counters (documents, batches, failed batches).",
                request_example: None,
            },
        ],
    })
}

/// Request-level rejection rendered as `{ "error": "..." }`.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, message = %self.message, "Rejecting request");
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

//! HTTP request handlers

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::error::{FetchFailure, ProcessorError, RenderFailure};
use crate::pipeline::{JobOutcome, SegmentRequest, SegmentRequestBody};
use crate::state::AppState;

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    NotFound,
    StageFailed {
        stage: &'static str,
        reason: &'static str,
        details: String,
        stderr: Option<String>,
    },
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            HttpError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "File expired or not found" }),
            ),
            HttpError::StageFailed {
                stage,
                reason,
                details,
                stderr,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Processing failed",
                    "stage": stage,
                    "reason": reason,
                    "details": details,
                    "stderr": stderr.unwrap_or_else(|| "No stderr available".to_string()),
                }),
            ),
            HttpError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Processing failed", "details": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProcessorError> for HttpError {
    fn from(err: ProcessorError) -> Self {
        match err {
            ProcessorError::Validation(msg) => HttpError::BadRequest(msg),
            ProcessorError::NotFound(_) => HttpError::NotFound,
            ProcessorError::Fetch(e) => HttpError::StageFailed {
                stage: "fetch",
                reason: e.reason.as_str(),
                stderr: (e.reason == FetchFailure::ToolFailure).then(|| e.detail.clone()),
                details: e.to_string(),
            },
            ProcessorError::Render(e) => HttpError::StageFailed {
                stage: "render",
                reason: e.reason.as_str(),
                stderr: (e.reason == RenderFailure::ToolFailure).then(|| e.detail.clone()),
                details: e.to_string(),
            },
            other => HttpError::InternalError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::BadRequest(rejection.body_text())
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "shorts-processor" }))
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("shorts-processor v", env!("CARGO_PKG_VERSION"))
}

/// Segment processing endpoint
/// POST /process-segment
pub async fn process_segment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SegmentRequestBody>, JsonRejection>,
) -> Result<Json<Value>, HttpError> {
    let Json(body) = payload?;
    let request = SegmentRequest::try_from(body)?;
    let delivery = state.config.delivery;

    let permit = state
        .job_slots
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| HttpError::InternalError(e.to_string()))?;

    // The job owns its task: a dropped connection does not cancel it
    let job_state = state.clone();
    let job_request = request.clone();
    let outcome = tokio::spawn(async move {
        let _permit = permit;
        job_state.pipeline.run(&job_request, delivery).await
    })
    .await
    .map_err(|e| HttpError::InternalError(format!("segment job aborted: {}", e)))??;

    let segment = json!({
        "start": request.start(),
        "duration": request.duration(),
    });

    let body = match outcome {
        JobOutcome::Inline {
            bytes,
            file_name,
            size,
        } => json!({
            "success": true,
            "video": base64::engine::general_purpose::STANDARD.encode(&bytes),
            "fileName": file_name,
            "size": size,
            "segment": segment,
        }),
        JobOutcome::Stored {
            artifact,
            file_name,
        } => json!({
            "success": true,
            "downloadUrl": format!("{}/download/{}", base_url(&state, &headers), artifact.id),
            "fileName": file_name,
            "size": artifact.size,
            "expiresInSecs": state.store.ttl().as_secs(),
            "expiresAt": artifact.expires_at.to_rfc3339(),
            "segment": segment,
        }),
    };

    Ok(Json(body))
}

/// Public origin for download links: configured, else taken from `Host`
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.socket_addr());
    format!("http://{}", host)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequestBody {
    pub video_url: Option<String>,
}

/// Transcript endpoint
/// POST /get-transcript
pub async fn get_transcript(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TranscriptRequestBody>, JsonRejection>,
) -> Result<Json<Value>, HttpError> {
    let Json(body) = payload?;
    let url = body
        .video_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest("videoUrl required".to_string()))?;

    let job_state = state.clone();
    let response = tokio::spawn(async move { job_state.transcripts.fetch(&url).await })
        .await
        .map_err(|e| HttpError::InternalError(format!("transcript job aborted: {}", e)))??;

    let mut body = serde_json::to_value(&response)
        .map_err(|e| HttpError::InternalError(e.to_string()))?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("success".to_string(), Value::Bool(true));
    }
    Ok(Json(body))
}

/// Stored artifact download
/// GET /download/{id}
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    // Open under the entry lock on the blocking pool, then stream the handle
    let store = state.store.clone();
    let (artifact, file) = tokio::task::spawn_blocking(move || store.open(&id))
        .await
        .map_err(|e| HttpError::InternalError(e.to_string()))??;

    tracing::debug!(artifact_id = %artifact.id, size = artifact.size, "Serving artifact");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(artifact.size));
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.file_name()))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    let stream = ReaderStream::new(tokio::fs::File::from_std(file));
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// Explicit consumption of a stored artifact
/// DELETE /download/{id}
pub async fn delete_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpError> {
    state.store.discard(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Debug endpoint - stored artifacts
pub async fn artifact_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.store.stats();

    Json(json!({
        "entry_count": stats.entry_count,
        "total_size_bytes": stats.total_size_bytes,
        "ttl_secs": stats.ttl_secs,
        "oldest_entry_age_secs": stats.oldest_entry_age_secs,
        "jobs_in_flight": state.jobs_in_flight(),
        "max_concurrent_jobs": state.config.max_concurrent_jobs,
    }))
}

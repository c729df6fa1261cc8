//! Document upload and job lookup handlers.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use tracing::{info, warn};
use uuid::Uuid;

use finsight_core::{
    CertificationLevel, DocumentSource, DocumentUpload, JobStatus, ProcessingJob,
};

use crate::{ApiError, ApiResponse, AppState};

/// Accumulated multipart fields for one upload.
#[derive(Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    title: Option<String>,
    source: Option<String>,
    level: Option<String>,
    url: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                form.file = Some(bytes.to_vec());
            }
            "title" => form.title = Some(read_text(field).await?),
            "source" => form.source = Some(read_text(field).await?),
            "level" => form.level = Some(read_text(field).await?),
            "url" => form.url = Some(read_text(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))
}

/// `POST /documents/upload` — multipart file + metadata, returns the
/// processing job summary.
///
/// Missing required fields and unusable file types surface as 400; pipeline
/// failures are captured in the returned job's FAILED state.
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ProcessingJob>>, ApiError> {
    let form = read_form(multipart).await?;

    let bytes = form
        .file
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("A non-empty 'file' field is required".to_string()))?;
    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("A 'title' field is required".to_string()))?;
    let source: DocumentSource = form
        .source
        .ok_or_else(|| ApiError::BadRequest("A 'source' field is required".to_string()))?
        .parse()
        .map_err(ApiError::BadRequest)?;
    let level = match form.level {
        Some(raw) => raw.parse::<CertificationLevel>().map_err(ApiError::BadRequest)?,
        None => CertificationLevel::default(),
    };

    let upload = DocumentUpload {
        title,
        source,
        level,
        url: form.url,
    };

    info!(title = %upload.title, source = %upload.source, size = bytes.len(), "Document upload received");

    let outcome = state.processor.process_document(&bytes, upload).await;

    // Persist vectors for completed jobs; storage trouble is logged, not
    // surfaced, since the job itself succeeded.
    if outcome.job.status == JobStatus::Completed {
        if let Some(document) = &outcome.document {
            if let Err(e) = state.knowledge.store_chunks(document, &outcome.chunks).await {
                warn!(document_id = %document.id, error = %e, "Failed to store chunk vectors");
            }
        }
    }

    let job = outcome.job.clone();
    state.jobs.write().await.insert(job.id, outcome.job);

    Ok(Json(ApiResponse::ok(job)))
}

/// `GET /documents/jobs/:id` — look up a processing job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProcessingJob>>, ApiError> {
    let jobs = state.jobs.read().await;
    let job = jobs
        .get(&id)
        .cloned()
        .ok_or(finsight_core::Error::JobNotFound(id))?;
    Ok(Json(ApiResponse::ok(job)))
}

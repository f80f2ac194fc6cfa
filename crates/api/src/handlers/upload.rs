//! Handler for the upload boundary.
//!
//! Receives the multipart form (`video` + `fromLang` + `toLang`), stores
//! the file under `originals/`, creates the job record, and submits it to
//! the scheduler. A full admission queue unwinds the whole upload: the
//! record and the stored file are both removed before the 503 goes out.

use std::path::Path as FsPath;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use validator::Validate;
use vaani_core::language;
use vaani_core::status::JobStatus;
use vaani_core::types::JobId;
use vaani_store::NewJob;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Upload size cap in bytes (100MB).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Container MIME types accepted from clients.
const ALLOWED_VIDEO_TYPES: [&str; 4] = [
    "video/mp4",
    "video/avi",
    "video/quicktime",
    "video/x-ms-wmv",
];

/// Fallback extension when the client filename carries none.
const DEFAULT_EXTENSION: &str = "mp4";

/// Language fields of the upload form, shape-checked before the registry
/// lookup.
#[derive(Debug, Validate)]
struct LanguageFields {
    #[validate(length(min = 1, max = 16))]
    from_lang: String,
    #[validate(length(min = 1, max = 16))]
    to_lang: String,
}

/// Created-job payload returned to the uploader.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// POST /api/upload
///
/// Multipart fields:
/// - `video`: the source file (required, MIME whitelist, 100MB cap)
/// - `fromLang`: source language code (required)
/// - `toLang`: target language code (required)
///
/// Returns 201 with `{ "data": { "jobId": ..., "status": "queued" } }`.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadResult>>)> {
    let mut video: Option<(String, Vec<u8>)> = None;
    let mut from_lang: Option<String> = None;
    let mut to_lang: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "video" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !ALLOWED_VIDEO_TYPES.contains(&content_type.as_str()) {
                    return Err(AppError::BadRequest(format!(
                        "Unsupported video type: {content_type}"
                    )));
                }

                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if data.is_empty() {
                    return Err(AppError::BadRequest("Video file is empty".to_string()));
                }
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::BadRequest(
                        "Video file exceeds the 100MB limit".to_string(),
                    ));
                }
                video = Some((filename, data.to_vec()));
            }
            "fromLang" => {
                from_lang = Some(read_text_field(field).await?);
            }
            "toLang" => {
                to_lang = Some(read_text_field(field).await?);
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let (filename, data) =
        video.ok_or_else(|| AppError::BadRequest("Missing video file".to_string()))?;
    let langs = LanguageFields {
        from_lang: from_lang
            .ok_or_else(|| AppError::BadRequest("Missing fromLang field".to_string()))?,
        to_lang: to_lang.ok_or_else(|| AppError::BadRequest("Missing toLang field".to_string()))?,
    };
    langs
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    language::validate_pair(&langs.from_lang, &langs.to_lang, state.config.strict_languages)?;

    // Upload-time name: collision-free enough for a single server, and
    // matches what clients see in the originals directory.
    let extension = FsPath::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(DEFAULT_EXTENSION);
    let stored_name = format!("{}.{extension}", chrono::Utc::now().timestamp_millis());
    let source_path = state.layout.originals_dir().join(stored_name);

    tokio::fs::write(&source_path, &data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store upload: {e}")))?;

    let job = state
        .store
        .create(NewJob {
            source_path: source_path.clone(),
            from_lang: langs.from_lang,
            to_lang: langs.to_lang,
        })
        .await?;

    if let Err(err) = state.scheduler.submit(job.id) {
        // Unwind: the job was never admitted, so neither the record nor
        // the stored file should survive.
        let _ = state.store.delete(job.id).await;
        if let Err(io_err) = tokio::fs::remove_file(&source_path).await {
            tracing::warn!(path = %source_path.display(), error = %io_err, "failed to remove rejected upload");
        }
        return Err(err.into());
    }

    tracing::info!(
        job_id = %job.id,
        from_lang = %job.from_lang,
        to_lang = %job.to_lang,
        bytes = data.len(),
        "upload accepted",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResult {
                job_id: job.id,
                status: job.status,
            },
        }),
    ))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

//! Spreadsheet import API handlers
//!
//! POST /import/participants, POST /import/programs
//!
//! Multipart form fields: `file` (the spreadsheet) and `dryRun`
//! (`"true"` | `"false"`, default `"false"`).

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use std::io::Write;
use tempfile::NamedTempFile;
use ysr_common::models::{ParticipantDraft, ProgramDraft};

use crate::api::auth::ElevatedStaff;
use crate::error::{ApiError, ApiResult};
use crate::models::ImportReport;
use crate::services::{ImportOrchestrator, ImportRequest, SpreadsheetFormat};
use crate::types::ImportEntity;
use crate::AppState;

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "text/csv",
    "application/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/octet-stream",
    "text/plain",
];

/// Spreadsheet received from the form, held on disk for this request only
struct StoredUpload {
    /// Deleted when dropped
    file: NamedTempFile,
    format: SpreadsheetFormat,
    original_name: String,
    size: usize,
}

/// POST /import/participants
pub async fn import_participants(
    State(state): State<AppState>,
    ElevatedStaff(staff): ElevatedStaff,
    multipart: Multipart,
) -> ApiResult<Json<ImportReport<ParticipantDraft>>> {
    run_import::<ParticipantDraft>(state, staff.id, multipart).await
}

/// POST /import/programs
pub async fn import_programs(
    State(state): State<AppState>,
    ElevatedStaff(staff): ElevatedStaff,
    multipart: Multipart,
) -> ApiResult<Json<ImportReport<ProgramDraft>>> {
    run_import::<ProgramDraft>(state, staff.id, multipart).await
}

async fn run_import<E: ImportEntity>(
    state: AppState,
    staff_id: uuid::Uuid,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportReport<E>>> {
    let mut upload: Option<StoredUpload> = None;
    let mut dry_run = false;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "dryRun" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read dryRun: {}", e))
                })?;
                dry_run = parse_dry_run(&value)?;
            }
            "file" => {
                if upload.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one file may be uploaded per import".to_string(),
                    ));
                }

                let original_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("File part has no file name".to_string()))?;
                let format = SpreadsheetFormat::from_file_name(&original_name)?;
                check_content_type(field.content_type())?;

                let mut file = tempfile::Builder::new()
                    .prefix("import-")
                    .suffix(&format!(".{}", format.extension()))
                    .tempfile_in(&state.uploads_dir)?;

                let mut size = 0usize;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                {
                    size += chunk.len();
                    if size > state.max_upload_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "File exceeds the {} MB upload limit",
                            state.max_upload_bytes / (1024 * 1024)
                        )));
                    }
                    file.write_all(&chunk)?;
                }
                file.flush()?;

                upload = Some(StoredUpload {
                    file,
                    format,
                    original_name,
                    size,
                });
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    tracing::info!(
        kind = %E::KIND,
        file = %upload.original_name,
        bytes = upload.size,
        dry_run,
        staff_id = %staff_id,
        "Import upload received"
    );

    let orchestrator = ImportOrchestrator::new(state.db.clone(), state.extractor.clone());
    let request = ImportRequest {
        file_path: upload.file.path().to_path_buf(),
        extension: upload.format.extension().to_string(),
        dry_run,
        staff_id: Some(staff_id),
    };

    // `upload` (and its temporary file) is dropped on every return path below
    let report = orchestrator.run::<E>(request).await?;
    drop(upload);

    Ok(Json(report))
}

fn parse_dry_run(value: &str) -> ApiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" => Ok(false),
        "true" => Ok(true),
        other => Err(ApiError::BadRequest(format!(
            "Invalid dryRun value '{}' (expected \"true\" or \"false\")",
            other
        ))),
    }
}

fn check_content_type(content_type: Option<&str>) -> ApiResult<()> {
    let Some(content_type) = content_type else {
        return Ok(());
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Unsupported content type '{}'; upload a CSV or Excel file",
            essence
        )))
    }
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/participants", post(import_participants))
        .route("/import/programs", post(import_programs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dry_run() {
        assert!(!parse_dry_run("").unwrap());
        assert!(!parse_dry_run("false").unwrap());
        assert!(parse_dry_run(" TRUE ").unwrap());
        assert!(parse_dry_run("yes").is_err());
    }

    #[test]
    fn test_content_types() {
        assert!(check_content_type(None).is_ok());
        assert!(check_content_type(Some("text/csv; charset=utf-8")).is_ok());
        assert!(check_content_type(Some(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        ))
        .is_ok());
        assert!(check_content_type(Some("image/png")).is_err());
    }
}

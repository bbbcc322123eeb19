//! Import pipeline orchestrator
//!
//! Sequences one import run inside the request that started it:
//! UPLOADED → PARSED → EXTRACTED → VALIDATED → DRY_RUN_COMPLETE | PERSISTED
//!
//! Parse and extraction failures abort the run. The uploaded file belongs to
//! the caller, which removes it whatever the outcome.

use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ImportError;
use crate::models::{ImportOutcome, ImportReport, ImportRun, ImportStage};
use crate::services::{file_parser, persistence_writer, record_validator};
use crate::types::{ImportEntity, RecordExtractor};

/// Inputs of one import run
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Location of the uploaded spreadsheet
    pub file_path: PathBuf,
    /// Original file extension, decides the parser
    pub extension: String,
    /// Stop after validation without writing
    pub dry_run: bool,
    /// Staff member recorded as creator of saved records
    pub staff_id: Option<Uuid>,
}

/// Import pipeline orchestrator
#[derive(Clone)]
pub struct ImportOrchestrator {
    db: SqlitePool,
    extractor: Arc<dyn RecordExtractor>,
}

impl ImportOrchestrator {
    pub fn new(db: SqlitePool, extractor: Arc<dyn RecordExtractor>) -> Self {
        Self { db, extractor }
    }

    /// Execute one import run for entity type `E`
    pub async fn run<E: ImportEntity>(
        &self,
        request: ImportRequest,
    ) -> Result<ImportReport<E>, ImportError> {
        let mut run = ImportRun::new(E::KIND, request.dry_run);

        tracing::info!(
            run_id = %run.run_id,
            kind = %E::KIND,
            dry_run = request.dry_run,
            extractor = self.extractor.name(),
            "Starting import run"
        );

        match self.execute::<E>(&mut run, &request).await {
            Ok(report) => {
                tracing::info!(
                    run_id = %run.run_id,
                    kind = %E::KIND,
                    total = report.total_processed,
                    accepted = report.accepted_count(),
                    save_errors = report.save_errors.len(),
                    invalid = report.invalid.len(),
                    elapsed_ms = run.elapsed_ms(),
                    "Import run complete"
                );
                Ok(report)
            }
            Err(e) => {
                let failed_at = run.stage;
                run.transition_to(ImportStage::Failed);
                tracing::warn!(
                    run_id = %run.run_id,
                    kind = %E::KIND,
                    stage = ?failed_at,
                    error = %e,
                    "Import run failed"
                );
                Err(e)
            }
        }
    }

    async fn execute<E: ImportEntity>(
        &self,
        run: &mut ImportRun,
        request: &ImportRequest,
    ) -> Result<ImportReport<E>, ImportError> {
        // UPLOADED → PARSED
        let rows = file_parser::parse_file(&request.file_path, &request.extension)?;
        if rows.is_empty() {
            return Err(ImportError::Parse("file contains no data rows".to_string()));
        }
        run.transition_to(ImportStage::Parsed);
        tracing::debug!(run_id = %run.run_id, rows = rows.len(), "Rows parsed");

        // PARSED → EXTRACTED
        let batch = self.extractor.extract(&rows, E::KIND).await?;
        let records = E::from_batch(batch)?;
        run.transition_to(ImportStage::Extracted);
        tracing::debug!(run_id = %run.run_id, records = records.len(), "Records extracted");

        // EXTRACTED → VALIDATED
        let total_processed = records.len();
        let (valid, invalid) = record_validator::partition(records);
        run.transition_to(ImportStage::Validated);
        tracing::debug!(
            run_id = %run.run_id,
            valid = valid.len(),
            invalid = invalid.len(),
            "Records validated"
        );

        if request.dry_run {
            run.transition_to(ImportStage::DryRunComplete);
            return Ok(ImportReport {
                total_processed,
                outcome: ImportOutcome::Validated(valid),
                save_errors: Vec::new(),
                invalid,
            });
        }

        // VALIDATED → PERSISTED
        let written = persistence_writer::persist_all(&self.db, &valid, request.staff_id).await;
        run.transition_to(ImportStage::Persisted);

        Ok(ImportReport {
            total_processed,
            outcome: ImportOutcome::Saved(written.saved),
            save_errors: written.save_errors,
            invalid,
        })
    }
}

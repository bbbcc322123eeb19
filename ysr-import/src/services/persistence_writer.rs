//! Persistence writer
//!
//! Writes valid records one at a time. The store suppresses an insert whose
//! natural key is already held by an active record; that outcome and any store
//! failure are collected as save errors. Records written earlier in the loop
//! are never rolled back.

use sqlx::SqlitePool;
use uuid::Uuid;
use ysr_common::db::InsertOutcome;

use crate::models::{SaveError, SaveErrorCode};
use crate::types::ImportEntity;

/// Saved records and per-record failures of one write pass
#[derive(Debug)]
pub struct WriteOutcome<E: ImportEntity> {
    pub saved: Vec<E::Persisted>,
    pub save_errors: Vec<SaveError>,
}

pub async fn persist_all<E: ImportEntity>(
    pool: &SqlitePool,
    records: &[E],
    created_by: Option<Uuid>,
) -> WriteOutcome<E> {
    let mut saved = Vec::with_capacity(records.len());
    let mut save_errors = Vec::new();

    for record in records {
        match record.insert_if_absent(pool, created_by).await {
            Ok(InsertOutcome::Inserted(persisted)) => saved.push(persisted),
            Ok(InsertOutcome::Duplicate) => {
                tracing::debug!(
                    kind = %E::KIND,
                    key = %record.natural_key(),
                    "Skipping duplicate record"
                );
                save_errors.push(SaveError {
                    name: record.display_name().to_string(),
                    key: record.natural_key().to_string(),
                    code: SaveErrorCode::DuplicateKey,
                    error: record.duplicate_message(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    kind = %E::KIND,
                    key = %record.natural_key(),
                    error = %e,
                    "Failed to save record"
                );
                save_errors.push(SaveError {
                    name: record.display_name().to_string(),
                    key: record.natural_key().to_string(),
                    code: SaveErrorCode::PersistenceError,
                    error: format!("Failed to save {}: {}", E::KIND, e),
                });
            }
        }
    }

    WriteOutcome { saved, save_errors }
}

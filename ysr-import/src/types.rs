//! Core types and trait definitions for the import pipeline
//!
//! Pipeline: File Parser → `RecordExtractor` → Record Validator →
//! Persistence Writer, sequenced by the import orchestrator.
//!
//! `RecordExtractor` is the seam around the hosted model: production uses the
//! OpenAI client, offline deployments and tests inject deterministic
//! implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;
use ysr_common::db::{self, InsertOutcome};
use ysr_common::models::{Participant, ParticipantDraft, Program, ProgramDraft};

use crate::models::Row;
use crate::services::record_validator;

// ============================================================================
// Entity kinds and extracted batches
// ============================================================================

/// Which collection an import targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Participant,
    Program,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Participant => "participant",
            EntityKind::Program => "program",
        }
    }

    /// Capitalized plural used in response keys (`savedParticipants`)
    pub fn plural_title(&self) -> &'static str {
        match self {
            EntityKind::Participant => "Participants",
            EntityKind::Program => "Programs",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records produced by one extraction call
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedBatch {
    Participants(Vec<ParticipantDraft>),
    Programs(Vec<ProgramDraft>),
}

impl ExtractedBatch {
    pub fn kind(&self) -> EntityKind {
        match self {
            ExtractedBatch::Participants(_) => EntityKind::Participant,
            ExtractedBatch::Programs(_) => EntityKind::Program,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ExtractedBatch::Participants(records) => records.len(),
            ExtractedBatch::Programs(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Extraction failures; all are fatal to the import run and never retried
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Request to language model failed: {0}")]
    Request(String),

    #[error("Language model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Language model returned an empty response")]
    EmptyResponse,

    #[error("Language model response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Language model response has unexpected shape: {0}")]
    UnexpectedShape(String),

    #[error("Extractor returned {actual} records for a {expected} import")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },
}

/// Turns unstructured rows into candidate records of one kind
#[async_trait]
pub trait RecordExtractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        rows: &[Row],
        kind: EntityKind,
    ) -> Result<ExtractedBatch, ExtractionError>;
}

// ============================================================================
// Validation
// ============================================================================

/// Outcome of validating one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Human-readable messages, in field order
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

// ============================================================================
// Importable entities
// ============================================================================

/// A draft record the pipeline can validate and persist
#[async_trait]
pub trait ImportEntity: Clone + Serialize + Send + Sync + 'static {
    /// Stored form returned by the store on insert
    type Persisted: Serialize + Clone + std::fmt::Debug + Send + Sync;

    const KIND: EntityKind;

    /// Take this kind's records out of a batch
    fn from_batch(batch: ExtractedBatch) -> Result<Vec<Self>, ExtractionError>;

    fn validate(&self) -> ValidationResult;

    fn display_name(&self) -> &str;

    /// Value of the uniqueness field
    fn natural_key(&self) -> &str;

    /// Message recorded when the natural key is already taken
    fn duplicate_message(&self) -> String;

    async fn insert_if_absent(
        &self,
        pool: &SqlitePool,
        created_by: Option<Uuid>,
    ) -> ysr_common::Result<InsertOutcome<Self::Persisted>>;
}

#[async_trait]
impl ImportEntity for ParticipantDraft {
    type Persisted = Participant;

    const KIND: EntityKind = EntityKind::Participant;

    fn from_batch(batch: ExtractedBatch) -> Result<Vec<Self>, ExtractionError> {
        match batch {
            ExtractedBatch::Participants(records) => Ok(records),
            other => Err(ExtractionError::KindMismatch {
                expected: Self::KIND,
                actual: other.kind(),
            }),
        }
    }

    fn validate(&self) -> ValidationResult {
        record_validator::validate_participant(self)
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn natural_key(&self) -> &str {
        &self.identification_number
    }

    fn duplicate_message(&self) -> String {
        format!(
            "Participant with identification number {} already exists",
            self.identification_number
        )
    }

    async fn insert_if_absent(
        &self,
        pool: &SqlitePool,
        created_by: Option<Uuid>,
    ) -> ysr_common::Result<InsertOutcome<Participant>> {
        db::participants::insert_if_absent(pool, self, created_by).await
    }
}

#[async_trait]
impl ImportEntity for ProgramDraft {
    type Persisted = Program;

    const KIND: EntityKind = EntityKind::Program;

    fn from_batch(batch: ExtractedBatch) -> Result<Vec<Self>, ExtractionError> {
        match batch {
            ExtractedBatch::Programs(records) => Ok(records),
            other => Err(ExtractionError::KindMismatch {
                expected: Self::KIND,
                actual: other.kind(),
            }),
        }
    }

    fn validate(&self) -> ValidationResult {
        record_validator::validate_program(self)
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn natural_key(&self) -> &str {
        &self.name
    }

    fn duplicate_message(&self) -> String {
        format!("Program with name '{}' already exists", self.name)
    }

    async fn insert_if_absent(
        &self,
        pool: &SqlitePool,
        created_by: Option<Uuid>,
    ) -> ysr_common::Result<InsertOutcome<Program>> {
        db::programs::insert_if_absent(pool, self, created_by).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_batch_rejects_other_kind() {
        let batch = ExtractedBatch::Programs(vec![ProgramDraft::default()]);
        let err = ParticipantDraft::from_batch(batch).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::KindMismatch {
                expected: EntityKind::Participant,
                actual: EntityKind::Program
            }
        ));
    }

    #[test]
    fn test_validation_result_from_errors() {
        assert!(ValidationResult::from_errors(vec![]).is_valid);
        let invalid = ValidationResult::from_errors(vec!["bad".into()]);
        assert!(!invalid.is_valid);
        assert_eq!(invalid.errors, vec!["bad"]);
    }

    #[test]
    fn test_duplicate_messages_mention_already_exists() {
        let participant = ParticipantDraft {
            identification_number: "ID-77".into(),
            ..Default::default()
        };
        let program = ProgramDraft {
            name: "Art Club".into(),
            ..Default::default()
        };
        assert!(participant.duplicate_message().contains("already exists"));
        assert!(program.duplicate_message().contains("'Art Club'"));
    }
}

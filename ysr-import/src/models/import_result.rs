//! Import run results
//!
//! Per-record problems never abort a run: invalid records, duplicate keys
//! and store failures are collected here and returned with the summary.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::types::{EntityKind, ImportEntity};

/// Error code of a record that could not be saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaveErrorCode {
    /// An active record with the same natural key exists
    DuplicateKey,
    /// The store rejected or failed the write
    PersistenceError,
}

/// One valid record the Persistence Writer did not save
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveError {
    pub name: String,
    /// Natural key value of the record
    pub key: String,
    pub code: SaveErrorCode,
    pub error: String,
}

/// A record that failed validation, with its messages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidRecord<E> {
    #[serde(flatten)]
    pub record: E,
    pub errors: Vec<String>,
}

/// What happened to the valid records
#[derive(Debug, Clone)]
pub enum ImportOutcome<E: ImportEntity> {
    /// Dry run: valid drafts, nothing written
    Validated(Vec<E>),
    /// Records inserted by the Persistence Writer
    Saved(Vec<E::Persisted>),
}

/// Summary returned to the caller for one import run
#[derive(Debug, Clone)]
pub struct ImportReport<E: ImportEntity> {
    /// Number of extracted records
    pub total_processed: usize,
    pub outcome: ImportOutcome<E>,
    pub save_errors: Vec<SaveError>,
    pub invalid: Vec<InvalidRecord<E>>,
}

impl<E: ImportEntity> ImportReport<E> {
    pub fn kind(&self) -> EntityKind {
        E::KIND
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.outcome, ImportOutcome::Validated(_))
    }

    /// Valid records (dry run) or saved records (otherwise)
    pub fn accepted_count(&self) -> usize {
        match &self.outcome {
            ImportOutcome::Validated(records) => records.len(),
            ImportOutcome::Saved(records) => records.len(),
        }
    }

    pub fn message(&self) -> String {
        let noun = E::KIND.plural_title().to_lowercase();
        match &self.outcome {
            ImportOutcome::Validated(valid) => format!(
                "Dry run completed: {} valid {}, {} invalid",
                valid.len(),
                noun,
                self.invalid.len()
            ),
            ImportOutcome::Saved(saved) => format!(
                "Import completed: {} {} saved, {} save errors, {} invalid",
                saved.len(),
                noun,
                self.save_errors.len(),
                self.invalid.len()
            ),
        }
    }
}

// Response keys depend on the entity kind and on the dry-run flag
// (`savedParticipants` vs `validPrograms`), so the report serializes by hand.
impl<E: ImportEntity> Serialize for ImportReport<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let plural = E::KIND.plural_title();
        let invalid_key = format!("invalid{}", plural);

        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("message", &self.message())?;

        match &self.outcome {
            ImportOutcome::Validated(valid) => {
                let valid_key = format!("valid{}", plural);
                map.serialize_entry(
                    "summary",
                    &DryRunSummary {
                        plural,
                        total_processed: self.total_processed,
                        valid: valid.len(),
                        invalid: self.invalid.len(),
                    },
                )?;
                map.serialize_entry(&valid_key, valid)?;
                map.serialize_entry("saveErrors", &self.save_errors)?;
            }
            ImportOutcome::Saved(saved) => {
                let saved_key = format!("saved{}", plural);
                map.serialize_entry(
                    "summary",
                    &PersistSummary {
                        plural,
                        total_processed: self.total_processed,
                        saved: saved.len(),
                        save_errors: self.save_errors.len(),
                        invalid: self.invalid.len(),
                    },
                )?;
                map.serialize_entry(&saved_key, saved)?;
                map.serialize_entry("saveErrors", &self.save_errors)?;
            }
        }

        map.serialize_entry(&invalid_key, &self.invalid)?;
        map.end()
    }
}

struct PersistSummary {
    plural: &'static str,
    total_processed: usize,
    saved: usize,
    save_errors: usize,
    invalid: usize,
}

impl Serialize for PersistSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("totalProcessed", &self.total_processed)?;
        map.serialize_entry(&format!("saved{}", self.plural), &self.saved)?;
        map.serialize_entry("saveErrors", &self.save_errors)?;
        map.serialize_entry("validationErrors", &self.invalid)?;
        map.end()
    }
}

struct DryRunSummary {
    plural: &'static str,
    total_processed: usize,
    valid: usize,
    invalid: usize,
}

impl Serialize for DryRunSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("totalProcessed", &self.total_processed)?;
        map.serialize_entry(&format!("valid{}", self.plural), &self.valid)?;
        map.serialize_entry(&format!("invalid{}", self.plural), &self.invalid)?;
        map.serialize_entry("validationErrors", &self.invalid)?;
        map.end()
    }
}

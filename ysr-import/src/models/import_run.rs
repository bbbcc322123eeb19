//! Import run state machine
//!
//! An import run moves through its stages in order:
//! UPLOADED → PARSED → EXTRACTED → VALIDATED → DRY_RUN_COMPLETE | PERSISTED,
//! with FAILED reachable from any non-terminal stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EntityKind;

/// Stage of one import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStage {
    /// File received and stored for the request
    Uploaded,
    /// Rows read from the spreadsheet
    Parsed,
    /// Candidate records returned by the extractor
    Extracted,
    /// Records partitioned into valid and invalid
    Validated,
    /// Dry run finished, nothing written
    DryRunComplete,
    /// Valid records handed to the store
    Persisted,
    /// Parse or extraction failure
    Failed,
}

impl ImportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStage::DryRunComplete | ImportStage::Persisted | ImportStage::Failed
        )
    }

    /// Whether `next` may follow this stage
    pub fn can_transition_to(&self, next: ImportStage) -> bool {
        use ImportStage::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Uploaded, Parsed)
            | (Parsed, Extracted)
            | (Extracted, Validated)
            | (Validated, DryRunComplete)
            | (Validated, Persisted) => true,
            _ => false,
        }
    }
}

/// Stage change event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub run_id: Uuid,
    pub old_stage: ImportStage,
    pub new_stage: ImportStage,
    pub transitioned_at: DateTime<Utc>,
}

/// One request's passage through the pipeline (in-memory only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: Uuid,
    pub kind: EntityKind,
    pub dry_run: bool,
    pub stage: ImportStage,
    pub started_at: DateTime<Utc>,
    /// Set when a terminal stage is reached
    pub ended_at: Option<DateTime<Utc>>,
    pub history: Vec<StageTransition>,
}

impl ImportRun {
    pub fn new(kind: EntityKind, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind,
            dry_run,
            stage: ImportStage::Uploaded,
            started_at: Utc::now(),
            ended_at: None,
            history: Vec::new(),
        }
    }

    /// Move to `new_stage`
    ///
    /// Out-of-order transitions are logged and ignored; the run keeps its
    /// current stage.
    pub fn transition_to(&mut self, new_stage: ImportStage) -> Option<StageTransition> {
        if !self.stage.can_transition_to(new_stage) {
            tracing::warn!(
                run_id = %self.run_id,
                from = ?self.stage,
                to = ?new_stage,
                "Ignoring invalid import stage transition"
            );
            return None;
        }

        let transition = StageTransition {
            run_id: self.run_id,
            old_stage: self.stage,
            new_stage,
            transitioned_at: Utc::now(),
        };
        self.stage = new_stage;

        if new_stage.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        tracing::debug!(
            run_id = %self.run_id,
            kind = %self.kind,
            stage = ?new_stage,
            "Import stage transition"
        );

        self.history.push(transition.clone());
        Some(transition)
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn elapsed_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds()
    }
}

//! Data models for ysr-import

pub mod import_result;
pub mod import_run;
pub mod row;

pub use import_result::{ImportOutcome, ImportReport, InvalidRecord, SaveError, SaveErrorCode};
pub use import_run::{ImportRun, ImportStage, StageTransition};
pub use row::Row;

//! Import pipeline services
//!
//! File Parser → Extraction Client → Record Validator → Persistence Writer,
//! sequenced by the orchestrator.

pub mod column_extractor;
pub mod file_parser;
pub mod import_orchestrator;
pub mod openai_client;
pub mod persistence_writer;
pub mod prompts;
pub mod record_validator;

pub use column_extractor::ColumnMappingExtractor;
pub use file_parser::{parse_file, SpreadsheetFormat};
pub use import_orchestrator::{ImportOrchestrator, ImportRequest};
pub use openai_client::{parse_extraction_response, OpenAiExtractor};
pub use persistence_writer::{persist_all, WriteOutcome};

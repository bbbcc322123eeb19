//! Database access for YSR
//!
//! SQLite stands in for the document store: each table is one collection,
//! rows get a store-assigned UUID and timestamps on insert.

pub mod init;
pub mod participants;
pub mod programs;
pub mod settings;
pub mod staff;

pub use init::{init_database_pool, init_memory_pool, init_tables};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

/// Result of a conditional insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    /// Row written
    Inserted(T),
    /// An active row with the same natural key already exists; nothing written
    Duplicate,
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_list(column: &str, value: &str) -> Result<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", column, e)))
}

pub(crate) fn encode_list(column: &str, items: &[String]) -> Result<String> {
    serde_json::to_string(items)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", column, e)))
}

//! Per-field validation of extracted records
//!
//! Pure functions. Each failing field yields exactly one message, in field
//! order, and every message names its field in lower-case words.

use chrono::NaiveDate;
use ysr_common::models::{ParticipantDraft, ProgramDraft};

use crate::models::InvalidRecord;
use crate::types::{ImportEntity, ValidationResult};

const MIN_NAME_CHARS: usize = 2;
const MIN_IDENTIFICATION_CHARS: usize = 3;
const MIN_DESCRIPTION_CHARS: usize = 10;

pub fn validate_participant(record: &ParticipantDraft) -> ValidationResult {
    let mut errors = Vec::new();

    if char_len(&record.name) < MIN_NAME_CHARS {
        errors.push(format!(
            "Invalid name: must be at least {} characters",
            MIN_NAME_CHARS
        ));
    }

    if char_len(&record.identification_number) < MIN_IDENTIFICATION_CHARS {
        errors.push(format!(
            "Invalid identification number: must be at least {} characters",
            MIN_IDENTIFICATION_CHARS
        ));
    }

    if record.date_of_birth.trim().is_empty() {
        errors.push("Date of birth is required".to_string());
    } else if !is_iso_date(&record.date_of_birth) {
        errors.push(
            "Invalid date of birth: must be a valid date in YYYY-MM-DD format".to_string(),
        );
    }

    if !record.referral_date.trim().is_empty() && !is_iso_date(&record.referral_date) {
        errors.push(
            "Invalid referral date: must be a valid date in YYYY-MM-DD format".to_string(),
        );
    }

    ValidationResult::from_errors(errors)
}

pub fn validate_program(record: &ProgramDraft) -> ValidationResult {
    let mut errors = Vec::new();

    if char_len(&record.name) < MIN_NAME_CHARS {
        errors.push(format!(
            "Invalid program name: must be at least {} characters",
            MIN_NAME_CHARS
        ));
    }

    if record.description.trim().is_empty() {
        errors.push("Description is required".to_string());
    } else if char_len(&record.description) < MIN_DESCRIPTION_CHARS {
        errors.push(format!(
            "Invalid description: must be at least {} characters",
            MIN_DESCRIPTION_CHARS
        ));
    }

    ValidationResult::from_errors(errors)
}

/// `YYYY-MM-DD` and a real calendar date
///
/// ```
/// use ysr_import::services::record_validator::is_iso_date;
///
/// assert!(is_iso_date("2024-02-29"));
/// assert!(!is_iso_date("2023-02-29"));
/// assert!(!is_iso_date("2024-2-9"));
/// ```
pub fn is_iso_date(value: &str) -> bool {
    let value = value.trim();
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    shape_ok && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Split records into valid ones and invalid ones with their messages
pub fn partition<E: ImportEntity>(records: Vec<E>) -> (Vec<E>, Vec<InvalidRecord<E>>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for record in records {
        let result = record.validate();
        if result.is_valid {
            valid.push(record);
        } else {
            invalid.push(InvalidRecord {
                record,
                errors: result.errors,
            });
        }
    }

    (valid, invalid)
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

//! Rule-based extractor mapping spreadsheet columns to record fields
//!
//! Used when no language model is configured, and by tests that need
//! deterministic extraction. Header names are compared after lowercasing and
//! dropping spaces, underscores and hyphens.

use async_trait::async_trait;
use ysr_common::models::{ParticipantDraft, ProgramDraft};

use crate::models::Row;
use crate::types::{EntityKind, ExtractedBatch, ExtractionError, RecordExtractor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParticipantField {
    Name,
    DateOfBirth,
    Address,
    ReferralDate,
    School,
    IdentificationNumber,
    Programs,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgramField {
    Name,
    Description,
    Participants,
}

const PARTICIPANT_ALIASES: &[(&str, ParticipantField)] = &[
    ("name", ParticipantField::Name),
    ("fullname", ParticipantField::Name),
    ("participant", ParticipantField::Name),
    ("participantname", ParticipantField::Name),
    ("studentname", ParticipantField::Name),
    ("dob", ParticipantField::DateOfBirth),
    ("dateofbirth", ParticipantField::DateOfBirth),
    ("birthdate", ParticipantField::DateOfBirth),
    ("birthday", ParticipantField::DateOfBirth),
    ("address", ParticipantField::Address),
    ("homeaddress", ParticipantField::Address),
    ("referraldate", ParticipantField::ReferralDate),
    ("referred", ParticipantField::ReferralDate),
    ("dateofreferral", ParticipantField::ReferralDate),
    ("school", ParticipantField::School),
    ("schoolname", ParticipantField::School),
    ("id", ParticipantField::IdentificationNumber),
    ("idnumber", ParticipantField::IdentificationNumber),
    ("identificationnumber", ParticipantField::IdentificationNumber),
    ("identification", ParticipantField::IdentificationNumber),
    ("studentid", ParticipantField::IdentificationNumber),
    ("participantid", ParticipantField::IdentificationNumber),
    ("programs", ParticipantField::Programs),
    ("program", ParticipantField::Programs),
    ("notes", ParticipantField::Notes),
    ("note", ParticipantField::Notes),
    ("comments", ParticipantField::Notes),
];

const PROGRAM_ALIASES: &[(&str, ProgramField)] = &[
    ("name", ProgramField::Name),
    ("program", ProgramField::Name),
    ("programname", ProgramField::Name),
    ("title", ProgramField::Name),
    ("description", ProgramField::Description),
    ("details", ProgramField::Description),
    ("summary", ProgramField::Description),
    ("participants", ProgramField::Participants),
    ("participant", ProgramField::Participants),
    ("members", ProgramField::Participants),
    ("enrolled", ProgramField::Participants),
];

/// Deterministic column-mapping extractor
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnMappingExtractor;

impl ColumnMappingExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_participants(&self, rows: &[Row]) -> Vec<ParticipantDraft> {
        let mut records: Vec<ParticipantDraft> = Vec::new();

        for row in rows {
            let mut draft = ParticipantDraft::default();
            for (header, value) in row.iter() {
                let Some(field) = lookup(PARTICIPANT_ALIASES, header) else {
                    continue;
                };
                match field {
                    ParticipantField::Name => set_scalar(&mut draft.name, value),
                    ParticipantField::DateOfBirth => set_scalar(&mut draft.date_of_birth, value),
                    ParticipantField::Address => set_scalar(&mut draft.address, value),
                    ParticipantField::ReferralDate => set_scalar(&mut draft.referral_date, value),
                    ParticipantField::School => set_scalar(&mut draft.school, value),
                    ParticipantField::IdentificationNumber => {
                        set_scalar(&mut draft.identification_number, value)
                    }
                    ParticipantField::Programs => union(&mut draft.programs, split_list(value)),
                    ParticipantField::Notes => union(&mut draft.notes, split_list(value)),
                }
            }

            if draft == ParticipantDraft::default() {
                continue;
            }

            let existing = if draft.identification_number.is_empty() {
                None
            } else {
                records
                    .iter_mut()
                    .find(|r| r.identification_number == draft.identification_number)
            };

            match existing {
                Some(record) => merge_participant(record, draft),
                None => records.push(draft),
            }
        }

        records
    }

    pub fn extract_programs(&self, rows: &[Row]) -> Vec<ProgramDraft> {
        let mut records: Vec<ProgramDraft> = Vec::new();

        for row in rows {
            let mut draft = ProgramDraft::default();
            for (header, value) in row.iter() {
                match lookup(PROGRAM_ALIASES, header) {
                    Some(ProgramField::Name) => set_scalar(&mut draft.name, value),
                    Some(ProgramField::Description) => set_scalar(&mut draft.description, value),
                    Some(ProgramField::Participants) => {
                        union(&mut draft.participants, split_list(value))
                    }
                    None => {}
                }
            }

            if draft == ProgramDraft::default() {
                continue;
            }

            let key = draft.name_key();
            let existing = if key.is_empty() {
                None
            } else {
                records.iter_mut().find(|r| r.name_key() == key)
            };

            match existing {
                Some(record) => {
                    fill(&mut record.description, draft.description);
                    union(&mut record.participants, draft.participants);
                }
                None => records.push(draft),
            }
        }

        records
    }
}

#[async_trait]
impl RecordExtractor for ColumnMappingExtractor {
    fn name(&self) -> &'static str {
        "columns"
    }

    async fn extract(
        &self,
        rows: &[Row],
        kind: EntityKind,
    ) -> Result<ExtractedBatch, ExtractionError> {
        let batch = match kind {
            EntityKind::Participant => ExtractedBatch::Participants(self.extract_participants(rows)),
            EntityKind::Program => ExtractedBatch::Programs(self.extract_programs(rows)),
        };
        tracing::debug!(kind = %kind, rows = rows.len(), records = batch.len(), "Mapped columns");
        Ok(batch)
    }
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup<F: Copy>(aliases: &[(&str, F)], header: &str) -> Option<F> {
    let normalized = normalize_header(header);
    aliases
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, field)| *field)
}

fn set_scalar(target: &mut String, value: &str) {
    fill(target, value.trim().to_string());
}

/// First non-empty value wins
fn fill(target: &mut String, value: String) {
    if target.is_empty() && !value.is_empty() {
        *target = value;
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ';' || c == ',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Append items not already present, keeping order
fn union(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

fn merge_participant(record: &mut ParticipantDraft, other: ParticipantDraft) {
    fill(&mut record.name, other.name);
    fill(&mut record.date_of_birth, other.date_of_birth);
    fill(&mut record.address, other.address);
    fill(&mut record.referral_date, other.referral_date);
    fill(&mut record.school, other.school);
    union(&mut record.programs, other.programs);
    union(&mut record.notes, other.notes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> Row {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_header_aliases() {
        let rows = vec![row(&[
            ("Full Name", "Ana Ruiz"),
            ("DOB", "2012-04-09"),
            ("Student_ID", "A-100"),
            ("School Name", "North Middle"),
            ("Favorite Color", "green"),
        ])];

        let records = ColumnMappingExtractor::new().extract_participants(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ana Ruiz");
        assert_eq!(records[0].date_of_birth, "2012-04-09");
        assert_eq!(records[0].identification_number, "A-100");
        assert_eq!(records[0].school, "North Middle");
    }

    #[test]
    fn test_participant_rows_merge_by_id() {
        let rows = vec![
            row(&[("Name", "Ana Ruiz"), ("ID", "A-100"), ("Programs", "Robotics; Art")]),
            row(&[("Name", ""), ("ID", "A-100"), ("Programs", "Art, Soccer")]),
            row(&[("Name", "Bo Chen"), ("ID", ""), ("Programs", "")]),
            row(&[("Name", "Cy Diaz"), ("ID", ""), ("Programs", "")]),
        ];

        let records = ColumnMappingExtractor::new().extract_participants(&rows);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "Ana Ruiz");
        assert_eq!(records[0].programs, vec!["Robotics", "Art", "Soccer"]);
    }

    #[test]
    fn test_program_rows_merge_case_insensitively() {
        let rows = vec![
            row(&[("Program Name", "Robotics"), ("Participants", "Ana")]),
            row(&[
                ("Program Name", "ROBOTICS"),
                ("Description", "Build and program robots"),
                ("Participants", "Bo; Ana"),
            ]),
        ];

        let records = ColumnMappingExtractor::new().extract_programs(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Robotics");
        assert_eq!(records[0].description, "Build and program robots");
        assert_eq!(records[0].participants, vec!["Ana", "Bo"]);
    }

    #[test]
    fn test_unmapped_rows_dropped() {
        let rows = vec![row(&[("Color", "green")])];
        assert!(ColumnMappingExtractor::new().extract_programs(&rows).is_empty());
    }

    #[tokio::test]
    async fn test_extract_returns_requested_kind() {
        let rows = vec![row(&[("Name", "Robotics")])];
        let batch = ColumnMappingExtractor::new()
            .extract(&rows, EntityKind::Program)
            .await
            .unwrap();
        assert_eq!(batch.kind(), EntityKind::Program);
    }
}

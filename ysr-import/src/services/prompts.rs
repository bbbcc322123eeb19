//! Extraction prompt templates
//!
//! One fixed template per entity kind. The parsed rows are embedded as
//! pretty-printed JSON.

use crate::models::Row;
use crate::types::EntityKind;

pub const SYSTEM_PROMPT: &str = "You convert spreadsheet rows into normalized JSON records \
for a youth-services organization. You return only JSON, without commentary.";

const PARTICIPANT_INSTRUCTIONS: &str = r#"
Extract participant records from the spreadsheet rows above.

Return a JSON array where each element has exactly these fields:
[
  {
    "name": "Full name",
    "dateOfBirth": "YYYY-MM-DD",
    "address": "Street address",
    "referralDate": "YYYY-MM-DD",
    "school": "School name",
    "identificationNumber": "Identification number",
    "programs": ["Program name"],
    "notes": ["Note"]
  }
]

Rules:
1. Rows describing the same person belong to one record; merge their programs and notes.
2. If a participant has no identification number, infer one from the name and school.
3. Convert every date to YYYY-MM-DD.
4. Use an empty string for any missing text field and an empty array for any missing list.
5. Return ONLY the JSON array.
"#;

const PROGRAM_INSTRUCTIONS: &str = r#"
Extract program records from the spreadsheet rows above.

Return a JSON array where each element has exactly these fields:
[
  {
    "name": "Program name",
    "description": "What the program offers",
    "participants": ["Participant name"]
  }
]

Rules:
1. Rows describing the same program belong to one record; merge their participants.
2. Use an empty string for any missing text field and an empty array for any missing list.
3. Return ONLY the JSON array.
"#;

/// Build the user prompt for `kind` embedding `rows`
pub fn build_extraction_prompt(kind: EntityKind, rows: &[Row]) -> String {
    let rows_json = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
    let instructions = match kind {
        EntityKind::Participant => PARTICIPANT_INSTRUCTIONS,
        EntityKind::Program => PROGRAM_INSTRUCTIONS,
    };

    format!(
        "Spreadsheet rows ({count} total):\n<rows>\n{rows_json}\n</rows>\n{instructions}",
        count = rows.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_rows_and_kind_fields() {
        let rows: Vec<Row> = vec![[("Name", "Ana Ruiz"), ("ID", "A-100")].into_iter().collect()];

        let prompt = build_extraction_prompt(EntityKind::Participant, &rows);
        assert!(prompt.contains("\"Name\": \"Ana Ruiz\""));
        assert!(prompt.contains("identificationNumber"));
        assert!(prompt.contains("1 total"));

        let prompt = build_extraction_prompt(EntityKind::Program, &rows);
        assert!(prompt.contains("\"description\""));
        assert!(!prompt.contains("identificationNumber"));
    }
}

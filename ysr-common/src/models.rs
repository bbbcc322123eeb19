//! Entity models shared by the import service and the store
//!
//! Draft types are what the extraction step produces: no identity yet, every
//! field present (possibly empty). Persisted types wrap a draft with the
//! store-assigned identity and timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Participant record as extracted from an uploaded spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDraft {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "lenient_string")]
    pub date_of_birth: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: String,
    /// `YYYY-MM-DD`, may be empty
    #[serde(default, deserialize_with = "lenient_string")]
    pub referral_date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub school: String,
    /// Natural key of a participant
    #[serde(default, deserialize_with = "lenient_string")]
    pub identification_number: String,
    /// Program names the participant is enrolled in
    #[serde(default, deserialize_with = "lenient_list")]
    pub programs: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub notes: Vec<String>,
}

/// Program record as extracted from an uploaded spreadsheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDraft {
    /// Natural key of a program (compared case-insensitively)
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// Participant names enrolled in the program
    #[serde(default, deserialize_with = "lenient_list")]
    pub participants: Vec<String>,
}

impl ProgramDraft {
    /// Key used for case-insensitive uniqueness
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Stored participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: ParticipantDraft,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: ProgramDraft,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
        }
    }

    /// Roles allowed to run bulk imports
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "staff" => Ok(Role::Staff),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Staff member (authenticated operator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Accepts strings, numbers, booleans and null for a text field
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(scalar_to_string).unwrap_or_default())
}

/// Accepts an array, a single scalar, or null for a list field
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let items = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().map(scalar_to_string).collect(),
        Some(scalar) => vec![scalar_to_string(scalar)],
    };
    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

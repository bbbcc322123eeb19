//! Participant collection
//!
//! Uniqueness of `identification_number` among active rows is enforced by a
//! partial unique index; inserts use `ON CONFLICT DO NOTHING` so a duplicate
//! is detected atomically instead of by scan-then-insert.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{encode_list, parse_list, parse_timestamp, parse_uuid, InsertOutcome};
use crate::models::{Participant, ParticipantDraft};
use crate::Result;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, date_of_birth, address, referral_date, school,
           identification_number, programs, notes, is_active,
           created_by, created_at, updated_at
    FROM participants
"#;

/// Insert a participant unless an active one with the same identification number exists
pub async fn insert_if_absent(
    pool: &SqlitePool,
    draft: &ParticipantDraft,
    created_by: Option<Uuid>,
) -> Result<InsertOutcome<Participant>> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let programs = encode_list("programs", &draft.programs)?;
    let notes = encode_list("notes", &draft.notes)?;

    let result = sqlx::query(
        r#"
        INSERT INTO participants (
            id, name, date_of_birth, address, referral_date, school,
            identification_number, programs, notes, is_active,
            created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(id.to_string())
    .bind(&draft.name)
    .bind(&draft.date_of_birth)
    .bind(&draft.address)
    .bind(&draft.referral_date)
    .bind(&draft.school)
    .bind(&draft.identification_number)
    .bind(&programs)
    .bind(&notes)
    .bind(created_by.map(|u| u.to_string()))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(InsertOutcome::Duplicate);
    }

    Ok(InsertOutcome::Inserted(Participant {
        id,
        record: draft.clone(),
        is_active: true,
        created_by,
        created_at: now,
        updated_at: now,
    }))
}

/// Look up the active participant holding an identification number (exact match)
pub async fn find_active_by_identification_number(
    pool: &SqlitePool,
    identification_number: &str,
) -> Result<Option<Participant>> {
    let sql = format!(
        "{} WHERE identification_number = ? AND is_active = 1",
        SELECT_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(identification_number)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(participant_from_row).transpose()
}

/// All active participants, oldest first
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Participant>> {
    let sql = format!("{} WHERE is_active = 1 ORDER BY created_at, rowid", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(participant_from_row).collect()
}

/// Number of rows in the collection, active or not
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Soft-delete a participant; frees its identification number for reuse
pub async fn deactivate(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE participants SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn participant_from_row(row: &SqliteRow) -> Result<Participant> {
    let id: String = row.get("id");
    let programs: String = row.get("programs");
    let notes: String = row.get("notes");
    let created_by: Option<String> = row.get("created_by");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Participant {
        id: parse_uuid("id", &id)?,
        record: ParticipantDraft {
            name: row.get("name"),
            date_of_birth: row.get("date_of_birth"),
            address: row.get("address"),
            referral_date: row.get("referral_date"),
            school: row.get("school"),
            identification_number: row.get("identification_number"),
            programs: parse_list("programs", &programs)?,
            notes: parse_list("notes", &notes)?,
        },
        is_active: row.get::<i64, _>("is_active") != 0,
        created_by: created_by
            .as_deref()
            .map(|s| parse_uuid("created_by", s))
            .transpose()?,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

//! Program collection
//!
//! Program names are unique among active programs regardless of case. The
//! lowercased name is stored in `name_key`, which carries the partial unique
//! index.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{encode_list, parse_list, parse_timestamp, parse_uuid, InsertOutcome};
use crate::models::{Program, ProgramDraft};
use crate::Result;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, description, participants, is_active,
           created_by, created_at, updated_at
    FROM programs
"#;

/// Insert a program unless an active one with the same name (any case) exists
pub async fn insert_if_absent(
    pool: &SqlitePool,
    draft: &ProgramDraft,
    created_by: Option<Uuid>,
) -> Result<InsertOutcome<Program>> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let participants = encode_list("participants", &draft.participants)?;

    let result = sqlx::query(
        r#"
        INSERT INTO programs (
            id, name, name_key, description, participants, is_active,
            created_by, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(id.to_string())
    .bind(&draft.name)
    .bind(draft.name_key())
    .bind(&draft.description)
    .bind(&participants)
    .bind(created_by.map(|u| u.to_string()))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(InsertOutcome::Duplicate);
    }

    Ok(InsertOutcome::Inserted(Program {
        id,
        record: draft.clone(),
        is_active: true,
        created_by,
        created_at: now,
        updated_at: now,
    }))
}

/// Look up the active program with a name, ignoring case
pub async fn find_active_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Program>> {
    let sql = format!("{} WHERE name_key = ? AND is_active = 1", SELECT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(name.to_lowercase())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(program_from_row).transpose()
}

/// All active programs, oldest first
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Program>> {
    let sql = format!("{} WHERE is_active = 1 ORDER BY created_at, rowid", SELECT_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(program_from_row).collect()
}

/// Number of rows in the collection, active or not
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM programs")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Soft-delete a program; frees its name for reuse
pub async fn deactivate(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE programs SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn program_from_row(row: &SqliteRow) -> Result<Program> {
    let id: String = row.get("id");
    let participants: String = row.get("participants");
    let created_by: Option<String> = row.get("created_by");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Program {
        id: parse_uuid("id", &id)?,
        record: ProgramDraft {
            name: row.get("name"),
            description: row.get("description"),
            participants: parse_list("participants", &participants)?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    fn draft(name: &str) -> ProgramDraft {
        ProgramDraft {
            name: name.into(),
            description: "Weekly mentoring sessions for middle schoolers".into(),
            participants: vec!["Jordan Lee".into()],
        }
    }

    #[tokio::test]
    async fn test_insert_then_find_ignores_case() {
        let pool = init_memory_pool().await.unwrap();

        let outcome = insert_if_absent(&pool, &draft("Youth Mentoring"), None).await.unwrap();
        assert!(matches!(outcome, InsertOutcome::Inserted(_)));

        let found = find_active_by_name(&pool, "YOUTH mentoring")
            .await
            .unwrap()
            .expect("program should be found");
        assert_eq!(found.record, draft("Youth Mentoring"));
    }

    #[tokio::test]
    async fn test_name_differing_only_in_case_is_duplicate() {
        let pool = init_memory_pool().await.unwrap();

        insert_if_absent(&pool, &draft("Youth Mentoring"), None).await.unwrap();
        let second = insert_if_absent(&pool, &draft("youth mentoring"), None).await.unwrap();

        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(count(&pool).await.unwrap(), 1);
        assert_eq!(list_active(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deactivated_program_frees_name() {
        let pool = init_memory_pool().await.unwrap();

        let first = match insert_if_absent(&pool, &draft("Chess Club"), None).await.unwrap() {
            InsertOutcome::Inserted(p) => p,
            InsertOutcome::Duplicate => panic!("unexpected duplicate"),
        };
        deactivate(&pool, first.id).await.unwrap();

        let again = insert_if_absent(&pool, &draft("CHESS CLUB"), None).await.unwrap();
        assert!(matches!(again, InsertOutcome::Inserted(_)));
    }
}

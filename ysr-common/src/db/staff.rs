//! Staff accounts and their bearer-token digests

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid};
use crate::auth::{generate_token, hash_token};
use crate::models::{Role, Staff};
use crate::{Error, Result};

/// Create a staff member and return it with its plaintext token
///
/// The token is only available here; the database keeps its digest.
pub async fn create_staff(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    role: Role,
) -> Result<(Staff, String)> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Staff name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(Error::InvalidInput(format!("Invalid email address: {}", email)));
    }

    let token = generate_token();
    let staff = Staff {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        is_active: true,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO staff (id, name, email, role, token_hash, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(staff.id.to_string())
    .bind(&staff.name)
    .bind(&staff.email)
    .bind(staff.role.as_str())
    .bind(hash_token(&token))
    .bind(staff.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    tracing::info!(staff_id = %staff.id, role = %staff.role, "Staff member created");

    Ok((staff, token))
}

/// Find the active staff member owning a token digest
pub async fn find_active_by_token_hash(
    pool: &SqlitePool,
    token_hash: &str,
) -> Result<Option<Staff>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, email, role, is_active, created_at
        FROM staff
        WHERE token_hash = ? AND is_active = 1
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(staff_from_row).transpose()
}

/// Revoke a staff member's access
pub async fn deactivate(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE staff SET is_active = 0 WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn staff_from_row(row: &SqliteRow) -> Result<Staff> {
    let id: String = row.get("id");
    let role: String = row.get("role");
    let created_at: String = row.get("created_at");

    Ok(Staff {
        id: parse_uuid("id", &id)?,
        name: row.get("name"),
        email: row.get("email"),
        role: role.parse()?,
        is_active: row.get::<i64, _>("is_active") != 0,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

//! Database pool creation and schema initialization

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::Result;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Open (creating if needed) the database file and initialize the schema
///
/// Every pooled connection runs with foreign keys enforced, WAL journaling
/// and a 5 s busy timeout.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let newly_created = !db_path.exists();
    debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every pooled connection to `sqlite::memory:` gets its own database, so the
/// pool is capped at one connection.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS participants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            date_of_birth TEXT NOT NULL DEFAULT '',
            address TEXT NOT NULL DEFAULT '',
            referral_date TEXT NOT NULL DEFAULT '',
            school TEXT NOT NULL DEFAULT '',
            identification_number TEXT NOT NULL,
            programs TEXT NOT NULL DEFAULT '[]',
            notes TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Natural key: unique among active participants only
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_participants_identification_active
        ON participants (identification_number)
        WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            participants TEXT NOT NULL DEFAULT '[]',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // name_key is the lowercased name, giving case-insensitive uniqueness
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_programs_name_key_active
        ON programs (name_key)
        WHERE is_active = 1
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database tables initialized (settings, staff, participants, programs)");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let pool = init_memory_pool().await.unwrap();
        init_tables(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["participants", "programs", "settings", "staff"]);
    }

    #[tokio::test]
    async fn test_init_database_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("data").join("ysr.db");

        let pool = init_database_pool(&db_path).await.unwrap();
        pool.close().await;

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_file_pool_uses_wal_and_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database_pool(&dir.path().join("ysr.db")).await.unwrap();

        let (journal_mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (busy_timeout,): (i64,) = sqlx::query_as("PRAGMA busy_timeout")
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;

        assert_eq!(journal_mode.to_lowercase(), "wal");
        assert_eq!(foreign_keys, 1);
        assert_eq!(busy_timeout, 5000);
    }
}

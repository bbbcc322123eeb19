//! Key/value settings table

use sqlx::SqlitePool;

use crate::Result;

const OPENAI_API_KEY: &str = "openai_api_key";

/// Read a setting
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Insert or replace a setting
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_openai_api_key(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, OPENAI_API_KEY).await
}

pub async fn set_openai_api_key(pool: &SqlitePool, key: &str) -> Result<()> {
    set_setting(pool, OPENAI_API_KEY, key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    #[tokio::test]
    async fn test_missing_setting_is_none() {
        let pool = init_memory_pool().await.unwrap();
        assert_eq!(get_openai_api_key(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let pool = init_memory_pool().await.unwrap();
        set_openai_api_key(&pool, "sk-first").await.unwrap();
        set_openai_api_key(&pool, "sk-second").await.unwrap();
        assert_eq!(
            get_openai_api_key(&pool).await.unwrap().as_deref(),
            Some("sk-second")
        );
    }
}

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::timestamp;

/// Issued bearer tokens, stored by digest only.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    pool: SqlitePool,
}

impl TokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        digest: &str,
        user_id: i64,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO auth_tokens (digest, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(digest)
        .bind(user_id)
        .bind(timestamp(created_at))
        .bind(expires_at.map(timestamp))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Owner of an unexpired token with this digest.
    pub async fn find_owner(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT user_id FROM auth_tokens WHERE digest = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(digest)
        .bind(timestamp(now))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(user_id,)| user_id))
    }

    pub async fn delete_for_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Removes tokens that expired at or before `now`.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM auth_tokens WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(timestamp(now))
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    pub async fn count_for_user(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

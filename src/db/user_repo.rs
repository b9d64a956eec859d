use chrono::Utc;
use sqlx::SqlitePool;

use super::{parse_timestamp, timestamp};
use crate::models::User;

/// Storage for accounts, keyed by email.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    password_hash: String,
    is_staff: bool,
    is_active: bool,
    is_superuser: bool,
    date_joined: String,
    last_login: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            is_staff: row.is_staff,
            is_active: row.is_active,
            is_superuser: row.is_superuser,
            date_joined: parse_timestamp(&row.date_joined)?,
            last_login: row.last_login.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

/// Fields for a new account row. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, user: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, name, password_hash, is_staff, is_active, is_superuser, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.email)
        .bind(user.name)
        .bind(user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Lists accounts by id. `search` matches a substring of email or name.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<User>, sqlx::Error> {
        let rows: Vec<UserRow> = match search {
            Some(term) => {
                let pattern = format!("%{}%", term);
                sqlx::query_as(
                    "SELECT * FROM users WHERE email LIKE ? OR name LIKE ? ORDER BY id",
                )
                .bind(&pattern)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM users ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(User::try_from).collect()
    }

    /// Writes every mutable column of `user` back. `date_joined` is fixed.
    pub async fn update(&self, user: &User) -> Result<User, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, name = ?, password_hash = ?, is_staff = ?, is_active = ?,
                is_superuser = ?, last_login = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_staff)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.last_login.map(timestamp))
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(user.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn touch_last_login(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(timestamp(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes an account and, by cascade, everything it owns.
    /// Returns false if no such account existed.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;

    fn new_user<'a>(email: &'a str, name: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            name,
            password_hash: "$argon2id$placeholder",
            is_staff: false,
            is_active: true,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let ctx = TestContext::new().await;
        let repo = UserRepository::new(ctx.pool.clone());

        let created = repo.insert(&new_user("a@example.com", "A")).await.unwrap();
        assert_eq!(created.email, "a@example.com");
        assert!(created.is_active);
        assert!(created.last_login.is_none());

        let by_email = repo.get_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email, created);

        let by_id = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let ctx = TestContext::new().await;
        let repo = UserRepository::new(ctx.pool.clone());

        repo.insert(&new_user("a@example.com", "A")).await.unwrap();
        let err = repo
            .insert(&new_user("a@example.com", "Again"))
            .await
            .unwrap_err();

        match err {
            sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let ctx = TestContext::new().await;
        let repo = UserRepository::new(ctx.pool.clone());

        repo.insert(&new_user("alice@example.com", "Alice")).await.unwrap();
        repo.insert(&new_user("bob@example.com", "Bobby")).await.unwrap();
        repo.insert(&new_user("carol@test.org", "Carol")).await.unwrap();

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].email, "alice@example.com");
        assert_eq!(all[2].email, "carol@test.org");

        let found = repo.list(Some("example")).await.unwrap();
        assert_eq!(found.len(), 2);

        let found = repo.list(Some("bobby")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].email, "bob@example.com");
    }

    #[tokio::test]
    async fn test_update_and_touch_last_login() {
        let ctx = TestContext::new().await;
        let repo = UserRepository::new(ctx.pool.clone());

        let mut user = repo.insert(&new_user("a@example.com", "A")).await.unwrap();
        user.name = "Renamed".into();
        user.is_active = false;
        let updated = repo.update(&user).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(!updated.is_active);
        assert_eq!(updated.date_joined, user.date_joined);

        repo.touch_last_login(user.id).await.unwrap();
        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert!(fetched.last_login.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_is_decode_error() {
        let ctx = TestContext::new().await;
        let repo = UserRepository::new(ctx.pool.clone());

        let user = repo.insert(&new_user("a@example.com", "A")).await.unwrap();
        sqlx::query("UPDATE users SET last_login = 'yesterday' WHERE id = ?")
            .bind(user.id)
            .execute(&ctx.pool)
            .await
            .unwrap();

        assert!(matches!(
            repo.get_by_id(user.id).await,
            Err(sqlx::Error::Decode(_))
        ));
        assert!(repo.list(None).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let ctx = TestContext::new().await;
        let repo = UserRepository::new(ctx.pool.clone());

        let user = repo.insert(&new_user("a@example.com", "A")).await.unwrap();
        assert!(repo.delete(user.id).await.unwrap());
        assert!(!repo.delete(user.id).await.unwrap());
        assert!(repo.get_by_email("a@example.com").await.unwrap().is_none());
    }
}

mod named_repo;
mod recipe_repo;
mod token_repo;
mod user_repo;

pub use named_repo::{Named, NamedRepository};
pub use recipe_repo::RecipeRepository;
pub use token_repo::TokenRepository;
pub use user_repo::{NewUser, UserRepository};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Initialize the database connection pool and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Calls `connect` until it succeeds, sleeping `delay` between attempts.
///
/// Gives up after `attempts` failures and returns the last error.
pub async fn wait_for_db<T, F, Fut>(attempts: u32, delay: Duration, mut connect: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Database available after {} attempt(s)", attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Database unavailable ({}/{}), waiting {:?}: {}",
                    attempt,
                    attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fixed-width RFC 3339 form, so stored timestamps compare correctly as text.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp. A malformed value is a decode error.
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            tracing::warn!("Malformed stored timestamp '{}': {}", value, e);
            sqlx::Error::Decode(Box::new(e))
        })
}

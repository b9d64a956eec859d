//! Owner-scoped storage shared by tags and ingredients.
//!
//! Both record types are a name plus an owner, linked to recipes through a
//! join table. [`Named`] describes the table layout; [`NamedRepository`]
//! runs the queries, always filtered by the caller's id.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::marker::PhantomData;

use crate::models::{Ingredient, Tag};

/// A record that is just a name owned by one account.
pub trait Named: Serialize + Send + Unpin + Sized + 'static {
    /// Table holding the records
    const TABLE: &'static str;
    /// Join table linking records to recipes
    const LINK_TABLE: &'static str;
    /// Column in the join table that references this table
    const LINK_COLUMN: &'static str;

    fn from_row(id: i64, name: String, user_id: i64) -> Self;
}

impl Named for Tag {
    const TABLE: &'static str = "tags";
    const LINK_TABLE: &'static str = "recipe_tags";
    const LINK_COLUMN: &'static str = "tag_id";

    fn from_row(id: i64, name: String, user_id: i64) -> Self {
        Tag { id, name, user_id }
    }
}

impl Named for Ingredient {
    const TABLE: &'static str = "ingredients";
    const LINK_TABLE: &'static str = "recipe_ingredients";
    const LINK_COLUMN: &'static str = "ingredient_id";

    fn from_row(id: i64, name: String, user_id: i64) -> Self {
        Ingredient { id, name, user_id }
    }
}

#[derive(sqlx::FromRow)]
struct NamedRow {
    id: i64,
    name: String,
    user_id: i64,
}

impl NamedRow {
    fn into_record<T: Named>(self) -> T {
        T::from_row(self.id, self.name, self.user_id)
    }
}

pub struct NamedRepository<T> {
    pool: SqlitePool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for NamedRepository<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for NamedRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedRepository")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Named> NamedRepository<T> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    #[cfg(test)]
    pub async fn create(&self, owner: i64, name: &str) -> Result<T, sqlx::Error> {
        let sql = format!("INSERT INTO {} (user_id, name) VALUES (?, ?)", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(owner)
            .bind(name)
            .execute(&self.pool)
            .await?;

        self.get(owner, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// The caller's records, by name descending.
    pub async fn list(&self, owner: i64) -> Result<Vec<T>, sqlx::Error> {
        let sql = format!(
            "SELECT id, name, user_id FROM {} WHERE user_id = ? ORDER BY name DESC, id DESC",
            T::TABLE
        );
        let rows: Vec<NamedRow> = sqlx::query_as(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(NamedRow::into_record).collect())
    }

    /// `None` unless the record exists and belongs to `owner`.
    pub async fn get(&self, owner: i64, id: i64) -> Result<Option<T>, sqlx::Error> {
        let sql = format!(
            "SELECT id, name, user_id FROM {} WHERE id = ? AND user_id = ?",
            T::TABLE
        );
        let row: Option<NamedRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(NamedRow::into_record))
    }

    /// Renames a record the caller owns. `None` if it is not theirs.
    pub async fn rename(&self, owner: i64, id: i64, name: &str) -> Result<Option<T>, sqlx::Error> {
        let sql = format!(
            "UPDATE {} SET name = ? WHERE id = ? AND user_id = ?",
            T::TABLE
        );
        let result = sqlx::query(&sql)
            .bind(name)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(owner, id).await
    }

    /// Deletes a record the caller owns, unlinking it from every recipe.
    /// Returns false if it is not theirs.
    pub async fn delete(&self, owner: i64, id: i64) -> Result<bool, sqlx::Error> {
        let sql = format!("DELETE FROM {} WHERE id = ? AND user_id = ?", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Records linked to a recipe, by name.
    pub async fn for_recipe(&self, recipe_id: i64) -> Result<Vec<T>, sqlx::Error> {
        let sql = format!(
            "SELECT t.id, t.name, t.user_id FROM {table} t \
             JOIN {link} l ON l.{column} = t.id \
             WHERE l.recipe_id = ? ORDER BY t.name",
            table = T::TABLE,
            link = T::LINK_TABLE,
            column = T::LINK_COLUMN,
        );
        let rows: Vec<NamedRow> = sqlx::query_as(&sql)
            .bind(recipe_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(NamedRow::into_record).collect())
    }
}

/// Replaces a recipe's links with `names`, creating any of the owner's
/// records that do not exist yet. Runs on the caller's transaction.
pub(crate) async fn replace_links<T: Named>(
    conn: &mut SqliteConnection,
    owner: i64,
    recipe_id: i64,
    names: &[String],
) -> Result<(), sqlx::Error> {
    let clear = format!("DELETE FROM {} WHERE recipe_id = ?", T::LINK_TABLE);
    sqlx::query(&clear)
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    let find = format!(
        "SELECT id FROM {} WHERE user_id = ? AND name = ? ORDER BY id LIMIT 1",
        T::TABLE
    );
    let insert = format!("INSERT INTO {} (user_id, name) VALUES (?, ?)", T::TABLE);
    let link = format!(
        "INSERT OR IGNORE INTO {} (recipe_id, {}) VALUES (?, ?)",
        T::LINK_TABLE,
        T::LINK_COLUMN
    );

    for name in names {
        let existing: Option<(i64,)> = sqlx::query_as(&find)
            .bind(owner)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        let id = match existing {
            Some((id,)) => id,
            None => sqlx::query(&insert)
                .bind(owner)
                .bind(name)
                .execute(&mut *conn)
                .await?
                .last_insert_rowid(),
        };

        sqlx::query(&link)
            .bind(recipe_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

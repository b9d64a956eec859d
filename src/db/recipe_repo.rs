use sqlx::SqlitePool;

use super::named_repo::{replace_links, NamedRepository};
use crate::models::{Ingredient, NewRecipe, Price, Recipe, RecipeChanges, Tag};

/// Owner-scoped recipe storage. Every query filters on `user_id`.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
    tags: NamedRepository<Tag>,
    ingredients: NamedRepository<Ingredient>,
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    time_minutes: i32,
    price_cents: i64,
    link: String,
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            tags: NamedRepository::new(pool.clone()),
            ingredients: NamedRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn create(&self, owner: i64, recipe: &NewRecipe) -> Result<Recipe, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO recipes (user_id, title, description, time_minutes, price_cents, link)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.time_minutes)
        .bind(recipe.price.cents())
        .bind(&recipe.link)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        replace_links::<Tag>(&mut tx, owner, id, &recipe.tags).await?;
        replace_links::<Ingredient>(&mut tx, owner, id, &recipe.ingredients).await?;

        tx.commit().await?;

        self.get(owner, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// `None` unless the recipe exists and belongs to `owner`.
    pub async fn get(&self, owner: i64, id: i64) -> Result<Option<Recipe>, sqlx::Error> {
        let row: Option<RecipeRow> =
            sqlx::query_as("SELECT * FROM recipes WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => self.hydrate(row).await.map(Some),
            None => Ok(None),
        }
    }

    /// The caller's recipes, newest first.
    pub async fn list(&self, owner: i64) -> Result<Vec<Recipe>, sqlx::Error> {
        let rows: Vec<RecipeRow> =
            sqlx::query_as("SELECT * FROM recipes WHERE user_id = ? ORDER BY id DESC")
                .bind(owner)
                .fetch_all(&self.pool)
                .await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            recipes.push(self.hydrate(row).await?);
        }
        Ok(recipes)
    }

    /// Applies `changes` to a recipe the caller owns. The owner never
    /// changes. Returns `None` if the recipe is not theirs.
    pub async fn update(
        &self,
        owner: i64,
        id: i64,
        changes: &RecipeChanges,
    ) -> Result<Option<Recipe>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Must be the first statement, so the transaction holds the write
        // lock before anything reads.
        let updated = sqlx::query(
            r#"
            UPDATE recipes
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                time_minutes = COALESCE(?, time_minutes),
                price_cents = COALESCE(?, price_cents),
                link = COALESCE(?, link)
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(changes.title.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.time_minutes)
        .bind(changes.price.map(|p| p.cents()))
        .bind(changes.link.as_deref())
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(tags) = &changes.tags {
            replace_links::<Tag>(&mut tx, owner, id, tags).await?;
        }
        if let Some(ingredients) = &changes.ingredients {
            replace_links::<Ingredient>(&mut tx, owner, id, ingredients).await?;
        }

        tx.commit().await?;

        self.get(owner, id).await
    }

    /// Deletes a recipe the caller owns. Its tags and ingredients survive.
    /// Returns false if it is not theirs.
    pub async fn delete(&self, owner: i64, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn hydrate(&self, row: RecipeRow) -> Result<Recipe, sqlx::Error> {
        let tags = self.tags.for_recipe(row.id).await?;
        let ingredients = self.ingredients.for_recipe(row.id).await?;

        Ok(Recipe {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            time_minutes: row.time_minutes,
            price: Price::from_cents(row.price_cents),
            link: row.link,
            tags,
            ingredients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestContext;

    fn sample() -> NewRecipe {
        NewRecipe::new("Sample recipe", 22, Price::from_cents(525))
            .with_description("Sample description")
            .with_link("http://example.com/recipe.pdf")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("a@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());

        let created = repo
            .create(
                user.id,
                &sample()
                    .with_tags(vec!["Thai".into(), "Dinner".into()])
                    .with_ingredients(vec!["Prawns".into()]),
            )
            .await
            .unwrap();

        assert_eq!(created.user_id, user.id);
        assert_eq!(created.title, "Sample recipe");
        assert_eq!(created.price.to_string(), "5.25");
        assert_eq!(created.tags.len(), 2);
        assert_eq!(created.ingredients[0].name, "Prawns");

        let fetched = repo.get(user.id, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_list_scoped_newest_first() {
        let ctx = TestContext::new().await;
        let a = ctx.create_user("a@example.com", "Test@1234").await;
        let b = ctx.create_user("b@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());

        let first = repo.create(a.id, &sample()).await.unwrap();
        let second = repo.create(a.id, &sample()).await.unwrap();
        repo.create(b.id, &sample()).await.unwrap();

        let recipes = repo.list(a.id).await.unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].id, second.id);
        assert_eq!(recipes[1].id, first.id);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("a@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());

        let recipe = repo
            .create(user.id, &sample().with_tags(vec!["Breakfast".into()]))
            .await
            .unwrap();

        let changes = RecipeChanges {
            title: Some("New recipe title".into()),
            ..Default::default()
        };
        let updated = repo
            .update(user.id, recipe.id, &changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "New recipe title");
        assert_eq!(updated.link, recipe.link);
        assert_eq!(updated.description, recipe.description);
        assert_eq!(updated.tags, recipe.tags);
    }

    #[tokio::test]
    async fn test_update_replaces_and_clears_links() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("a@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());

        let recipe = repo
            .create(
                user.id,
                &sample()
                    .with_tags(vec!["Breakfast".into()])
                    .with_ingredients(vec!["Pepper".into()]),
            )
            .await
            .unwrap();

        let changes = RecipeChanges {
            tags: Some(vec!["Lunch".into()]),
            ingredients: Some(vec![]),
            ..Default::default()
        };
        let updated = repo
            .update(user.id, recipe.id, &changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].name, "Lunch");
        assert!(updated.ingredients.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_all_succeed() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("a@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());

        let mut ids = Vec::new();
        for _ in 0..8 {
            ids.push(repo.create(user.id, &sample()).await.unwrap().id);
        }

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..96 {
            let repo = repo.clone();
            let id = ids[i % ids.len()];
            tasks.spawn(async move {
                let changes = RecipeChanges {
                    title: Some(format!("Edit {i}")),
                    tags: Some(vec![format!("tag-{}", i % 5)]),
                    ..Default::default()
                };
                repo.update(user.id, id, &changes).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let updated = joined.unwrap().unwrap();
            assert!(updated.is_some());
        }
        for id in ids {
            let recipe = repo.get(user.id, id).await.unwrap().unwrap();
            assert!(recipe.title.starts_with("Edit "));
            assert_eq!(recipe.tags.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_other_owner_cannot_touch() {
        let ctx = TestContext::new().await;
        let a = ctx.create_user("a@example.com", "Test@1234").await;
        let b = ctx.create_user("b@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());

        let recipe = repo.create(a.id, &sample()).await.unwrap();
        let changes = RecipeChanges {
            title: Some("Hijacked".into()),
            ..Default::default()
        };

        assert!(repo.get(b.id, recipe.id).await.unwrap().is_none());
        assert!(repo.update(b.id, recipe.id, &changes).await.unwrap().is_none());
        assert!(!repo.delete(b.id, recipe.id).await.unwrap());

        let unchanged = repo.get(a.id, recipe.id).await.unwrap().unwrap();
        assert_eq!(unchanged.title, "Sample recipe");
    }

    #[tokio::test]
    async fn test_delete_keeps_tags_and_deleting_tag_unlinks() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("a@example.com", "Test@1234").await;
        let repo = RecipeRepository::new(ctx.pool.clone());
        let tags: NamedRepository<Tag> = NamedRepository::new(ctx.pool.clone());

        let keep = repo
            .create(user.id, &sample().with_tags(vec!["Vegan".into()]))
            .await
            .unwrap();
        let gone = repo
            .create(user.id, &sample().with_tags(vec!["Vegan".into()]))
            .await
            .unwrap();

        // Both recipes share the one tag
        assert_eq!(tags.list(user.id).await.unwrap().len(), 1);

        assert!(repo.delete(user.id, gone.id).await.unwrap());
        assert_eq!(tags.list(user.id).await.unwrap().len(), 1);

        assert!(tags.delete(user.id, keep.tags[0].id).await.unwrap());
        let keep = repo.get(user.id, keep.id).await.unwrap().unwrap();
        assert!(keep.tags.is_empty());
    }
}

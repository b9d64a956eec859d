use axum::{extract::State, http::StatusCode, Extension, Json};

use super::{Payload, RecordId};
use crate::error::{Error, Result};
use crate::models::{Recipe, RecipeFields, RecipeSummary};
use crate::server::{AppState, CurrentUser};

pub(super) async fn list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<RecipeSummary>>> {
    let recipes = state.recipes.list(user.id).await?;
    Ok(Json(recipes.into_iter().map(RecipeSummary::from).collect()))
}

pub(super) async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Payload(fields): Payload<RecipeFields>,
) -> Result<(StatusCode, Json<Recipe>)> {
    let new_recipe = fields.into_new()?;
    let recipe = state.recipes.create(user.id, &new_recipe).await?;
    tracing::info!("Account {} created recipe {}", user.id, recipe.id);
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub(super) async fn retrieve(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> Result<Json<Recipe>> {
    let recipe = state.recipes.get(user.id, id).await?.ok_or(Error::NotFound)?;
    Ok(Json(recipe))
}

pub(super) async fn replace(
    state: State<AppState>,
    user: Extension<CurrentUser>,
    id: RecordId,
    Payload(fields): Payload<RecipeFields>,
) -> Result<Json<Recipe>> {
    apply(state, user, id, fields, false).await
}

pub(super) async fn update(
    state: State<AppState>,
    user: Extension<CurrentUser>,
    id: RecordId,
    Payload(fields): Payload<RecipeFields>,
) -> Result<Json<Recipe>> {
    apply(state, user, id, fields, true).await
}

async fn apply(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    RecordId(id): RecordId,
    fields: RecipeFields,
    partial: bool,
) -> Result<Json<Recipe>> {
    // Ownership first, so another account's id is a 404 even with a bad body
    if state.recipes.get(user.id, id).await?.is_none() {
        return Err(Error::NotFound);
    }
    let changes = fields.validate(partial)?;
    let recipe = state
        .recipes
        .update(user.id, id, &changes)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(recipe))
}

pub(super) async fn destroy(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> Result<StatusCode> {
    if !state.recipes.delete(user.id, id).await? {
        return Err(Error::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{send, TestContext};
    use axum::http::{Method, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};

    async fn create_recipe(app: &Router, token: &str, extra: Value) -> Value {
        let mut body = json!({
            "title": "Sample recipe title",
            "time_minutes": 22,
            "price": "5.25",
            "description": "Sample description",
            "link": "http://example.com/recipe.pdf",
        });
        if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            body.extend(extra.clone());
        }
        let (status, created) =
            send(app, Method::POST, "/recipe/recipes", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        created
    }

    #[tokio::test]
    async fn test_auth_required() {
        let ctx = TestContext::new().await;

        let (status, _) = send(&ctx.app(), Method::GET, "/recipe/recipes", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_retrieve_recipes_newest_first_without_description() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let app = ctx.app();

        let first = create_recipe(&app, &token, json!({})).await;
        let second = create_recipe(&app, &token, json!({"title": "Second"})).await;

        let (status, body) = send(&app, Method::GET, "/recipe/recipes", Some(token.as_str()), None).await;

        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["id"], second["id"]);
        assert_eq!(list[1]["id"], first["id"]);
        assert!(list[0].get("description").is_none());
        assert_eq!(list[0]["price"], "5.25");
    }

    #[tokio::test]
    async fn test_recipe_list_limited_to_user() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let other = ctx.token_for("other@example.com", "password123").await;
        let app = ctx.app();

        create_recipe(&app, &other, json!({})).await;
        create_recipe(&app, &token, json!({})).await;

        let (_, body) = send(&app, Method::GET, "/recipe/recipes", Some(token.as_str()), None).await;

        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_recipe_detail() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let app = ctx.app();

        let created = create_recipe(&app, &token, json!({})).await;
        let url = format!("/recipe/recipes/{}", created["id"]);

        let (status, body) = send(&app, Method::GET, &url, Some(token.as_str()), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], "Sample description");
        assert_eq!(body, created);
    }

    #[tokio::test]
    async fn test_create_recipe_with_new_and_existing_tags() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let app = ctx.app();

        create_recipe(&app, &token, json!({"tags": [{"name": "Indian"}]})).await;
        let recipe = create_recipe(
            &app,
            &token,
            json!({
                "title": "Pongal",
                "tags": [{"name": "Indian"}, {"name": "Breakfast"}],
                "ingredients": [{"name": "Cauliflower"}, {"name": "Salt"}],
            }),
        )
        .await;

        assert_eq!(recipe["tags"].as_array().unwrap().len(), 2);
        assert_eq!(recipe["ingredients"].as_array().unwrap().len(), 2);

        let (_, tags) = send(&app, Method::GET, "/recipe/tags", Some(token.as_str()), None).await;
        assert_eq!(tags.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_recipe_validation() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;

        let (status, body) = send(
            &ctx.app(),
            Method::POST,
            "/recipe/recipes",
            Some(token.as_str()),
            Some(json!({"title": "", "price": "5.255"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["title"].is_array());
        assert!(body["fields"]["time_minutes"].is_array());
        assert!(body["fields"]["price"].is_array());
    }

    #[tokio::test]
    async fn test_partial_update() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let app = ctx.app();

        let created = create_recipe(&app, &token, json!({"tags": [{"name": "Thai"}]})).await;
        let url = format!("/recipe/recipes/{}", created["id"]);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &url,
            Some(token.as_str()),
            Some(json!({"title": "New recipe title"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "New recipe title");
        assert_eq!(body["link"], created["link"]);
        assert_eq!(body["tags"], created["tags"]);
    }

    #[tokio::test]
    async fn test_full_update() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let app = ctx.app();

        let created = create_recipe(&app, &token, json!({"tags": [{"name": "Thai"}]})).await;
        let url = format!("/recipe/recipes/{}", created["id"]);

        let (status, body) = send(
            &app,
            Method::PUT,
            &url,
            Some(token.as_str()),
            Some(json!({
                "title": "New recipe title",
                "link": "https://example.com/new-recipe.pdf",
                "description": "New recipe description",
                "time_minutes": 10,
                "price": "2.50",
                "tags": [],
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["time_minutes"], 10);
        assert_eq!(body["price"], "2.50");
        assert!(body["tags"].as_array().unwrap().is_empty());

        let (status, body) = send(
            &app,
            Method::PUT,
            &url,
            Some(token.as_str()),
            Some(json!({"title": "Missing the rest"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["fields"]["price"].is_array());
    }

    #[tokio::test]
    async fn test_other_users_recipe_is_404() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let other = ctx.token_for("other@example.com", "password123").await;
        let app = ctx.app();

        let created = create_recipe(&app, &other, json!({})).await;
        let url = format!("/recipe/recipes/{}", created["id"]);

        for method in [Method::GET, Method::PATCH, Method::DELETE] {
            let body = (method == Method::PATCH).then(|| json!({"title": "Mine now"}));
            let (status, _) = send(&app, method, &url, Some(token.as_str()), body).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        let (status, body) = send(&app, Method::GET, &url, Some(other.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Sample recipe title");
    }

    #[tokio::test]
    async fn test_delete_recipe() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("user@example.com", "test123").await;
        let app = ctx.app();

        let created = create_recipe(&app, &token, json!({})).await;
        let url = format!("/recipe/recipes/{}", created["id"]);

        let (status, body) = send(&app, Method::DELETE, &url, Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());

        let (status, _) = send(&app, Method::GET, &url, Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

//! HTTP surface: shared state, services and the router.

pub mod accounts;
pub mod auth;
pub mod routes;
pub mod tokens;

use axum::extract::FromRef;
use axum::{middleware, Router};
use sqlx::SqlitePool;
use std::sync::Arc;

pub use accounts::{AccountAttributes, AccountService, ProfileChanges, SignUp};
pub use auth::{auth_middleware, CurrentUser};
pub use tokens::TokenService;

use crate::config::Config;
use crate::db::{NamedRepository, RecipeRepository, TokenRepository, UserRepository};
use crate::error::Result;
use crate::models::{Ingredient, Tag};
use crate::passwords::Passwords;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenService>,
    pub recipes: RecipeRepository,
    pub tags: NamedRepository<Tag>,
    pub ingredients: NamedRepository<Ingredient>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Result<Self> {
        let passwords = Passwords::new(&config.argon2)?;
        let users = UserRepository::new(pool.clone());

        let accounts = AccountService::new(
            users.clone(),
            passwords.clone(),
            config.min_password_length,
        );
        let tokens = TokenService::new(
            TokenRepository::new(pool.clone()),
            users,
            passwords,
            config.token_ttl_hours,
        )?;

        Ok(Self {
            accounts: Arc::new(accounts),
            tokens: Arc::new(tokens),
            recipes: RecipeRepository::new(pool.clone()),
            tags: NamedRepository::new(pool.clone()),
            ingredients: NamedRepository::new(pool),
        })
    }
}

impl FromRef<AppState> for NamedRepository<Tag> {
    fn from_ref(state: &AppState) -> Self {
        state.tags.clone()
    }
}

impl FromRef<AppState> for NamedRepository<Ingredient> {
    fn from_ref(state: &AppState) -> Self {
        state.ingredients.clone()
    }
}

/// Builds the full router. Everything except `/health`, sign-up and token
/// issuance requires a token.
pub fn router(state: AppState) -> Router {
    let public_routes = routes::public_routes();

    let protected_routes = routes::protected_routes().route_layer(
        middleware::from_fn_with_state(state.clone(), auth_middleware),
    );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(routes::not_found)
        .method_not_allowed_fallback(routes::method_not_allowed)
        .with_state(state)
}

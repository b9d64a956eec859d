//! Route table, fallbacks and request extractors.

mod labels;
mod recipes;
mod users;

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, Method},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::AppState;
use crate::error::{Error, FieldErrors};
use crate::models::{Ingredient, Tag};

/// Routes reachable without a token.
pub(super) fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/user/create", post(users::create))
        .route("/user/token", post(users::token))
}

/// Routes that require a token. The caller arrives as
/// [`CurrentUser`](super::CurrentUser).
pub(super) fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/user/me",
            get(users::me).put(users::replace_me).patch(users::update_me),
        )
        .route(
            "/recipe/recipes",
            get(recipes::list).post(recipes::create),
        )
        .route(
            "/recipe/recipes/{id}",
            get(recipes::retrieve)
                .put(recipes::replace)
                .patch(recipes::update)
                .delete(recipes::destroy),
        )
        .route("/recipe/tags", get(labels::list::<Tag>))
        .route(
            "/recipe/tags/{id}",
            get(labels::retrieve::<Tag>)
                .put(labels::replace::<Tag>)
                .patch(labels::update::<Tag>)
                .delete(labels::destroy::<Tag>),
        )
        .route("/recipe/ingredients", get(labels::list::<Ingredient>))
        .route(
            "/recipe/ingredients/{id}",
            get(labels::retrieve::<Ingredient>)
                .put(labels::replace::<Ingredient>)
                .patch(labels::update::<Ingredient>)
                .delete(labels::destroy::<Ingredient>),
        )
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(super) async fn not_found() -> Error {
    Error::NotFound
}

pub(super) async fn method_not_allowed(method: Method) -> Error {
    Error::MethodNotAllowed(method.to_string())
}

/// JSON body whose rejections render as validation errors.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(Error::Validation(FieldErrors::single(
                "non_field_errors",
                rejection.body_text(),
            ))),
        }
    }
}

/// Numeric record id from the path. Anything unparseable is a 404, the
/// same as an id the caller does not own.
pub struct RecordId(pub i64);

impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| RecordId(id))
            .map_err(|_| Error::NotFound)
    }
}

//! Handlers shared by tags and ingredients.
//!
//! Neither can be created directly; they come into being through a recipe's
//! nested `tags` or `ingredients` list.

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Extension, Json,
};

use super::{Payload, RecordId};
use crate::db::{Named, NamedRepository};
use crate::error::{Error, Result};
use crate::models::NameFields;
use crate::server::{AppState, CurrentUser};

pub(super) async fn list<T>(
    State(repo): State<NamedRepository<T>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<T>>>
where
    T: Named,
    NamedRepository<T>: FromRef<AppState>,
{
    Ok(Json(repo.list(user.id).await?))
}

pub(super) async fn retrieve<T>(
    State(repo): State<NamedRepository<T>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> Result<Json<T>>
where
    T: Named,
    NamedRepository<T>: FromRef<AppState>,
{
    let record = repo.get(user.id, id).await?.ok_or(Error::NotFound)?;
    Ok(Json(record))
}

pub(super) async fn replace<T>(
    repo: State<NamedRepository<T>>,
    user: Extension<CurrentUser>,
    id: RecordId,
    Payload(fields): Payload<NameFields>,
) -> Result<Json<T>>
where
    T: Named,
    NamedRepository<T>: FromRef<AppState>,
{
    rename(repo, user, id, fields, false).await
}

pub(super) async fn update<T>(
    repo: State<NamedRepository<T>>,
    user: Extension<CurrentUser>,
    id: RecordId,
    Payload(fields): Payload<NameFields>,
) -> Result<Json<T>>
where
    T: Named,
    NamedRepository<T>: FromRef<AppState>,
{
    rename(repo, user, id, fields, true).await
}

async fn rename<T: Named>(
    State(repo): State<NamedRepository<T>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    RecordId(id): RecordId,
    fields: NameFields,
    partial: bool,
) -> Result<Json<T>> {
    let current = repo.get(user.id, id).await?.ok_or(Error::NotFound)?;
    let record = match fields.validate(partial)? {
        Some(name) => repo
            .rename(user.id, id, &name)
            .await?
            .ok_or(Error::NotFound)?,
        None => current,
    };
    Ok(Json(record))
}

pub(super) async fn destroy<T>(
    State(repo): State<NamedRepository<T>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    RecordId(id): RecordId,
) -> Result<StatusCode>
where
    T: Named,
    NamedRepository<T>: FromRef<AppState>,
{
    if !repo.delete(user.id, id).await? {
        return Err(Error::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

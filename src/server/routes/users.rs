use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};

use super::Payload;
use crate::error::{FieldErrors, Result};
use crate::models::{UserProfile, REQUIRED};
use crate::server::{AppState, CurrentUser, ProfileChanges, SignUp};

/// Public sign-up. Only email, password and name are read from the body.
pub(super) async fn create(
    State(state): State<AppState>,
    Payload(request): Payload<SignUp>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let user = state.accounts.sign_up(request).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

#[derive(Debug, Deserialize)]
pub(super) struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub(super) struct TokenResponse {
    token: String,
}

pub(super) async fn token(
    State(state): State<AppState>,
    Payload(credentials): Payload<Credentials>,
) -> Result<Json<TokenResponse>> {
    let mut errors = FieldErrors::new();
    if credentials.email.trim().is_empty() {
        errors.add("email", REQUIRED);
    }
    if credentials.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    errors.into_result()?;

    let token = state
        .tokens
        .issue_token(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(TokenResponse { token }))
}

pub(super) async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

pub(super) async fn replace_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Payload(changes): Payload<ProfileChanges>,
) -> Result<Json<UserProfile>> {
    let user = state.accounts.update_profile(&user, changes, false).await?;
    Ok(Json(UserProfile::from(&user)))
}

pub(super) async fn update_me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Payload(changes): Payload<ProfileChanges>,
) -> Result<Json<UserProfile>> {
    let user = state.accounts.update_profile(&user, changes, true).await?;
    Ok(Json(UserProfile::from(&user)))
}

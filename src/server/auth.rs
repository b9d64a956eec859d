use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::AppState;
use crate::error::{Error, Result};
use crate::models::User;

/// Authenticated account, added to request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

const MISSING_CREDENTIALS: &str = "Authentication credentials were not provided.";

/// Extracts the token from an `Authorization` value. Both the `Bearer` and
/// `Token` schemes are accepted, in any case.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !(scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token")) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| Error::Authentication(MISSING_CREDENTIALS.into()))?;

    let token = bearer_token(header_value)
        .ok_or_else(|| Error::Authentication(MISSING_CREDENTIALS.into()))?;

    let user = state.tokens.resolve(token).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

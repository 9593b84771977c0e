use super::{ApiError, AppState};
use crate::accounts::AccountError;
use crate::database::User;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

/// Whoever sent the request: `None` without a valid bearer token.
pub struct Viewer(pub Option<User>);

/// A signed-in user. Rejects the request with 401 otherwise.
pub struct CurrentUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(str::trim)
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(token) = bearer_token(parts) else {
        return Ok(None);
    };
    let claims = match state.tokens.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Ignoring bearer token");
            return Ok(None);
        }
    };

    // the account may have been merged away since the token was issued
    match state.accounts.find_user(claims.sub).await {
        Ok(user) => Ok(Some(user)),
        Err(AccountError::UserNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Viewer(resolve(parts, state).await?))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| AccountError::Unauthenticated.into())
    }
}

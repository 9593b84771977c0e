use crate::accounts::AccountError;
use crate::auth::AuthError;
use crate::database::DatabaseError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let message = e.to_string();
        match e {
            AccountError::Validation(_) | AccountError::Phone(_) | AccountError::InvalidCode => {
                ApiError::BadRequest(message)
            }
            AccountError::Delivery(_) => ApiError::BadGateway(message),
            AccountError::InvalidTelegramAuth
            | AccountError::InvalidCredentials
            | AccountError::Unauthenticated
            | AccountError::Auth(AuthError::InvalidToken) => ApiError::Unauthorized(message),
            AccountError::AccessDenied => ApiError::Forbidden(message),
            AccountError::UserNotFound
            | AccountError::InstructionNotFound
            | AccountError::Database(DatabaseError::UserNotFound)
            | AccountError::Database(DatabaseError::InstructionNotFound) => {
                ApiError::NotFound(message)
            }
            AccountError::TelegramAlreadyLinked
            | AccountError::Database(DatabaseError::Conflict(_)) => ApiError::Conflict(message),
            AccountError::Auth(e) => {
                error!(error = %e, "Auth failure");
                ApiError::Internal
            }
            AccountError::Database(e) => {
                error!(error = %e, "Database failure");
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        AccountError::Auth(e).into()
    }
}

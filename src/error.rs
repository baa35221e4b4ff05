use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::Role;

/// ApiError
///
/// The full failure taxonomy of the API. Every handler and extractor fails
/// with one of these variants; `IntoResponse` turns the variant into the
/// `{success: false, message}` envelope the frontend expects. Unexpected
/// failures (database, filesystem) are logged with full detail server-side
/// and surfaced to the caller as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The Authorization header is absent or not a Bearer credential.
    #[error("Not authorized to access this route - No token provided")]
    Unauthenticated,

    /// The token failed signature verification, expired, or carried a
    /// malformed payload.
    #[error("Not authorized to access this route - Invalid token")]
    InvalidToken,

    /// The token verified but its subject no longer maps to a user record.
    #[error("User not found")]
    UnknownUser,

    /// Login with an unknown email or a wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Ownership check failure: the caller is not the post's author.
    /// Carries the attempted action ("update" or "delete").
    #[error("Not authorized to {0} this post")]
    NotAuthorized(&'static str),

    /// Role check failure from the authorization gate.
    #[error("User role {0} is not authorized to access this route")]
    Forbidden(Role),

    /// The addressed resource does not exist. Carries the resource noun.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Server Error")]
    Database(#[from] sqlx::Error),

    #[error("Server Error")]
    Io(#[from] std::io::Error),

    #[error("Server Error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated
            | ApiError::InvalidToken
            | ApiError::UnknownUser
            | ApiError::InvalidCredentials
            | ApiError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Full detail stays server-side; the caller only sees the generic message.
        match &self {
            ApiError::Database(e) => tracing::error!("database error: {:?}", e),
            ApiError::Io(e) => tracing::error!("io error: {:?}", e),
            ApiError::Internal(msg) => tracing::error!("internal error: {}", msg),
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}

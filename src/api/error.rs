//! Request error taxonomy.
//!
//! Handlers validate input and entity existence before any side effect and
//! convert every failure into a JSON `{error}` body. Internal detail is
//! logged server-side and never exposed to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::messaging::DispatchError;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input.
    Validation(String),
    /// Referenced entity does not exist.
    NotFound(&'static str),
    /// Missing or invalid credential.
    Unauthorized(&'static str),
    /// Valid credential, insufficient role.
    Forbidden(&'static str),
    /// Duplicate unique field.
    Conflict(&'static str),
    /// Unexpected failure; detail stays in the logs.
    Database(sqlx::Error),
}

impl ApiError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Validation(message) => message,
            Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::Conflict(message) => message.to_string(),
            Self::Database(err) => {
                error!("request failed: {err}");
                "Internal server error".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidPhone => Self::Validation("Invalid phone number format".to_string()),
            DispatchError::Database(err) => Self::Database(err),
        }
    }
}

/// Postgres unique violations surface as 409 rather than 500.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Unauthorized("nope").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Conflict("dup").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_phone_maps_to_validation() {
        let err: ApiError = DispatchError::InvalidPhone.into();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn row_not_found_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Field-level validation failure, rendered under the `errors` key the way
/// the mobile client expects: `{"errors": {"email": ["..."]}}`.
#[derive(Debug)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid login details")]
    InvalidCredentials,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a single-field validation failure.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError {
            field,
            message: message.into(),
        }])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Storage details stay in the server log, never in the response body.
        if let AppError::Database(err) = &self {
            tracing::error!("database error: {err:?}");
        }
        if let AppError::Internal(msg) = &self {
            tracing::error!("internal error: {msg}");
        }

        let body = match &self {
            AppError::Validation(errors) => {
                let mut map = Map::new();
                for e in errors {
                    let entry = map
                        .entry(e.field.to_string())
                        .or_insert_with(|| Value::Array(vec![]));
                    if let Value::Array(messages) = entry {
                        messages.push(Value::String(e.message.clone()));
                    }
                }
                json!({ "status": false, "errors": map })
            }
            AppError::Database(_) | AppError::Internal(_) => {
                json!({ "status": false, "message": "Server error" })
            }
            other => json!({ "status": false, "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Property").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("Email already in use".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::validation("email", "The email field is required.").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn database_errors_never_leak_details() {
        let err = AppError::Database(sqlx::Error::RowNotFound);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_groups_messages_by_field() {
        let err = AppError::Validation(vec![
            FieldError { field: "email", message: "The email field is required.".into() },
            FieldError { field: "email", message: "The email has already been taken.".into() },
            FieldError { field: "password", message: "The password must be at least 6 characters.".into() },
        ]);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

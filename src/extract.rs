use axum::{
    async_trait,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Drop-in replacement for `axum::Json` whose rejection speaks the same
/// JSON error shape as everything else. A malformed or missing body comes
/// back as a 422 `{status:false, errors:{...}}` instead of axum's
/// plain-text rejection.
#[derive(Debug)]
pub struct Json<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Json<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Json(value)),
            Err(rejection) => Err(AppError::validation("body", rejection.body_text())),
        }
    }
}

impl<T: serde::Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Credentials {
        email: String,
        password: String,
    }

    fn request(content_type: &str, body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn valid_json_passes_through() {
        let req = request(
            "application/json",
            r#"{"email":"alice@test.com","password":"secret1"}"#,
        );
        let Json(creds) = Json::<Credentials>::from_request(req, &()).await.unwrap();
        assert_eq!(creds.email, "alice@test.com");
        assert_eq!(creds.password, "secret1");
    }

    #[tokio::test]
    async fn malformed_json_becomes_validation_error() {
        let req = request("application/json", "{not json");
        let err = Json::<Credentials>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_fields_become_validation_errors() {
        let req = request("application/json", r#"{"email":"alice@test.com"}"#);
        let err = Json::<Credentials>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn wrong_content_type_becomes_validation_error() {
        let req = request("text/plain", "email=alice");
        let err = Json::<Credentials>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::database::Database;
use crate::error::AppError;
use crate::models::user::User;
use crate::state::AppState;

/// Pulls the opaque token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
}

/// Issues a fresh opaque token bound to the user and persists it. Tokens are
/// long-lived; there is no expiry or TTL.
pub async fn issue_token(db: &Database, user_id: Uuid) -> Result<String, sqlx::Error> {
    let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

    sqlx::query("INSERT INTO access_tokens (id, user_id, token) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&token)
        .execute(db)
        .await?;

    Ok(token)
}

/// Drops every token of the user except the one that authenticated the
/// current request. Used after a password change.
pub async fn revoke_other_tokens(
    db: &Database,
    user_id: Uuid,
    keep: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM access_tokens WHERE user_id = $1 AND token <> $2")
        .bind(user_id)
        .bind(keep)
        .execute(db)
        .await?;
    Ok(())
}

async fn resolve_token(db: &Database, token: &str) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u
         JOIN access_tokens t ON t.user_id = u.id
         WHERE t.token = $1",
    )
    .bind(token)
    .fetch_optional(db)
    .await?;

    user.ok_or(AppError::Unauthorized)
}

/// The authenticated caller. Every protected handler takes this instead of
/// reaching for some global "current user".
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(AppError::Unauthorized)?
            .to_string();
        let user = resolve_token(&state.db, &token).await?;
        Ok(AuthUser { user, token })
    }
}

/// Admin-only guard. Admin routes take this extractor, so the role check
/// lives in exactly one place.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser { user, .. } = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let headers = headers_with("Bearer abc123");
        assert_eq!(bearer_token(&headers), Some("abc123"));
    }

    #[test]
    fn rejects_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn rejects_wrong_scheme_and_empty_token() {
        assert_eq!(bearer_token(&headers_with("Basic abc123")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("abc123")), None);
    }
}

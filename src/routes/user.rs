use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::{revoke_other_tokens, AuthUser};
use crate::error::AppError;
use crate::extract::Json;
use crate::models::user::{ChangePasswordRequest, UpdateContactRequest, User};
use crate::state::AppState;

pub async fn get_current_user(auth: AuthUser) -> Json<Value> {
    Json(json!({
        "status": true,
        "user": auth.user
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.new_password.len() < 6 {
        return Err(AppError::validation(
            "new_password",
            "The password must be at least 6 characters.",
        ));
    }

    let ok = bcrypt::verify(&payload.current_password, &auth.user.password_hash)
        .map_err(|e| AppError::Internal(format!("bcrypt: {e}")))?;
    if !ok {
        return Err(AppError::InvalidCredentials);
    }

    let password_hash = bcrypt::hash(&payload.new_password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("bcrypt: {e}")))?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(auth.user.id)
        .execute(&state.db)
        .await?;

    // Other sessions go stale; the token used for this request stays valid.
    revoke_other_tokens(&state.db, auth.user.id, &auth.token).await?;

    Ok(Json(json!({
        "status": true,
        "message": "Password updated successfully"
    })))
}

pub async fn update_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateContactRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.email.is_none() && payload.phone_number.is_none() {
        return Err(AppError::validation("email", "Nothing to update."));
    }

    let email = match payload.email.as_deref().map(str::trim) {
        Some("") => return Err(AppError::validation("email", "The email field is required.")),
        Some(e) if !e.contains('@') => {
            return Err(AppError::validation(
                "email",
                "The email must be a valid email address.",
            ))
        }
        Some(e) => Some(e.to_lowercase()),
        None => None,
    };

    if let Some(new_email) = &email {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id <> $2)",
        )
        .bind(new_email)
        .bind(auth.user.id)
        .fetch_one(&state.db)
        .await?;
        if taken {
            return Err(AppError::Conflict("Email already in use".into()));
        }
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET
         email = COALESCE($1, email),
         phone_number = COALESCE($2, phone_number),
         updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(&email)
    .bind(&payload.phone_number)
    .bind(auth.user.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "status": true,
        "message": "Contact details updated",
        "user": user
    })))
}

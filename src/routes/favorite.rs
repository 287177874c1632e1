use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::extract::Json;
use crate::models::favorite::{Favorite, ToggleFavoriteRequest};
use crate::models::property::Property;
use crate::state::AppState;

pub async fn toggle_favorite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ToggleFavoriteRequest>,
) -> Result<Json<Value>, AppError> {
    let existing = sqlx::query_as::<_, Favorite>(
        "SELECT * FROM favorites WHERE user_id = $1 AND property_id = $2",
    )
    .bind(auth.user.id)
    .bind(payload.property_id)
    .fetch_optional(&state.db)
    .await?;

    if let Some(favorite) = existing {
        sqlx::query("DELETE FROM favorites WHERE id = $1")
            .bind(favorite.id)
            .execute(&state.db)
            .await?;

        return Ok(Json(json!({ "status": true, "is_favorite": false })));
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM properties WHERE id = $1)")
        .bind(payload.property_id)
        .fetch_one(&state.db)
        .await?;
    if !exists {
        return Err(AppError::NotFound("Property"));
    }

    sqlx::query("INSERT INTO favorites (user_id, property_id) VALUES ($1, $2)")
        .bind(auth.user.id)
        .bind(payload.property_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "status": true, "is_favorite": true })))
}

/// Bare id list so the client can paint heart icons without a join.
pub async fn list_favorite_ids(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let ids = sqlx::query_scalar::<_, i32>(
        "SELECT property_id FROM favorites WHERE user_id = $1 ORDER BY property_id",
    )
    .bind(auth.user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!(ids)))
}

pub async fn list_favorite_properties(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let properties = sqlx::query_as::<_, Property>(
        "SELECT p.* FROM properties p
         JOIN favorites f ON f.property_id = p.id
         WHERE f.user_id = $1
         ORDER BY f.created_at DESC",
    )
    .bind(auth.user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!(properties)))
}

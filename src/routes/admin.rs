use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::extract::Json;
use crate::state::AppState;

/// Dashboard counts. Recomputed per call; the tables are small.
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>, AppError> {
    let users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    let properties = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM properties")
        .fetch_one(&state.db)
        .await?;
    let bookings = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings")
        .fetch_one(&state.db)
        .await?;

    Ok(Json(json!({
        "users": users,
        "properties": properties,
        "bookings": bookings
    })))
}

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use serde_json::{json, Value};

use crate::auth::AdminUser;
use crate::error::{AppError, FieldError};
use crate::extract::Json;
use crate::models::booking::{STATUS_CONFIRMED, STATUS_PENDING};
use crate::models::property::{CreatePropertyForm, Property, UpdatePropertyRequest};
use crate::state::AppState;
use crate::storage::extension_for;

pub async fn list_properties(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let properties =
        sqlx::query_as::<_, Property>("SELECT * FROM properties ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(json!(properties)))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;

    match property {
        Some(property) => Ok(Json(json!(property))),
        None => Err(AppError::NotFound("Property")),
    }
}

fn parse_int_field(raw: &Option<String>) -> Option<i32> {
    raw.as_deref().and_then(|v| v.trim().parse().ok())
}

pub async fn create_property(
    State(state): State<AppState>,
    _admin: AdminUser,
    req: Request,
) -> Result<Json<Value>, AppError> {
    // A non-multipart body gets the JSON error shape, not axum's
    // plain-text rejection.
    let mut multipart = Multipart::from_request(req, &state)
        .await
        .map_err(|e| AppError::validation("form", e.body_text()))?;

    let mut form = CreatePropertyForm::default();
    let mut image: Option<(Vec<u8>, &'static str)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("form", e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let ext = extension_for(field.content_type());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation("image", e.to_string()))?;
            image = Some((bytes.to_vec(), ext));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::validation("form", e.to_string()))?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "price" => form.price = Some(value),
            "location" => form.location = Some(value),
            "description" => form.description = Some(value),
            "category" => form.category = Some(value),
            "bedrooms" => form.bedrooms = Some(value),
            "bathrooms" => form.bathrooms = Some(value),
            "floor_area" => form.floor_area = Some(value),
            "phone_number" => form.phone_number = Some(value),
            _ => {}
        }
    }

    let mut errors: Vec<FieldError> = Vec::new();
    let missing = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or("").is_empty();

    if missing(&form.name) {
        errors.push(FieldError {
            field: "name",
            message: "The name field is required.".into(),
        });
    }
    if missing(&form.location) {
        errors.push(FieldError {
            field: "location",
            message: "The location field is required.".into(),
        });
    }
    if missing(&form.description) {
        errors.push(FieldError {
            field: "description",
            message: "The description field is required.".into(),
        });
    }

    let price = match form.price.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError {
                field: "price",
                message: "The price field is required.".into(),
            });
            0.0
        }
        Some(raw) => match raw.parse::<f64>() {
            Ok(p) if p >= 0.0 => p,
            _ => {
                errors.push(FieldError {
                    field: "price",
                    message: "The price must be a number of at least 0.".into(),
                });
                0.0
            }
        },
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let image_url = match image {
        Some((bytes, ext)) if !bytes.is_empty() => {
            Some(state.storage.store("properties", ext, &bytes).await?)
        }
        _ => None,
    };

    let property = sqlx::query_as::<_, Property>(
        "INSERT INTO properties (name, price, location, description, category,
                                 bedrooms, bathrooms, floor_area, phone_number, image_url)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(form.name.unwrap().trim())
    .bind(price)
    .bind(form.location.unwrap().trim())
    .bind(form.description.unwrap().trim())
    .bind(&form.category)
    .bind(parse_int_field(&form.bedrooms))
    .bind(parse_int_field(&form.bathrooms))
    .bind(&form.floor_area)
    .bind(&form.phone_number)
    .bind(&image_url)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "status": true,
        "message": "Property created",
        "property": property
    })))
}

pub async fn update_property(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePropertyRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(price) = payload.price {
        if price < 0.0 {
            return Err(AppError::validation(
                "price",
                "The price must be a number of at least 0.",
            ));
        }
    }

    let property = sqlx::query_as::<_, Property>(
        "UPDATE properties SET
         name = COALESCE($1, name),
         price = COALESCE($2, price),
         location = COALESCE($3, location),
         description = COALESCE($4, description),
         category = COALESCE($5, category),
         bedrooms = COALESCE($6, bedrooms),
         bathrooms = COALESCE($7, bathrooms),
         floor_area = COALESCE($8, floor_area),
         phone_number = COALESCE($9, phone_number),
         updated_at = NOW()
         WHERE id = $10
         RETURNING *",
    )
    .bind(&payload.name)
    .bind(payload.price)
    .bind(&payload.location)
    .bind(&payload.description)
    .bind(&payload.category)
    .bind(payload.bedrooms)
    .bind(payload.bathrooms)
    .bind(&payload.floor_area)
    .bind(&payload.phone_number)
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    match property {
        Some(property) => Ok(Json(json!({
            "status": true,
            "message": "Property updated",
            "property": property
        }))),
        None => Err(AppError::NotFound("Property")),
    }
}

pub async fn delete_property(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Property"))?;

    // A listing with pending or confirmed bookings cannot be removed.
    // Cancelled bookings and favorites cascade with the row.
    let active = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM bookings WHERE property_id = $1 AND status IN ($2, $3))",
    )
    .bind(id)
    .bind(STATUS_PENDING)
    .bind(STATUS_CONFIRMED)
    .fetch_one(&state.db)
    .await?;

    if active {
        return Err(AppError::Conflict(
            "Property has active bookings and cannot be deleted".into(),
        ));
    }

    sqlx::query("DELETE FROM properties WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if let Some(image_url) = &property.image_url {
        state.storage.delete(image_url).await;
    }

    Ok(Json(json!({
        "status": true,
        "message": "Property deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_fields_parse_leniently() {
        assert_eq!(parse_int_field(&Some("2".into())), Some(2));
        assert_eq!(parse_int_field(&Some(" 3 ".into())), Some(3));
        assert_eq!(parse_int_field(&Some("two".into())), None);
        assert_eq!(parse_int_field(&None), None);
    }
}

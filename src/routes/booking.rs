use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::auth::{AdminUser, AuthUser};
use crate::error::{AppError, FieldError};
use crate::extract::Json;
use crate::models::booking::{
    is_terminal, is_valid_target_status, total_price, Booking, BookingWithProperty,
    BookingWithPropertyAndUser, CreateBookingRequest, UpdateBookingStatusRequest, STATUS_PENDING,
};
use crate::models::property::Property;
use crate::state::AppState;

pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Value>, AppError> {
    let mut errors: Vec<FieldError> = Vec::new();

    if payload.phone_number.trim().is_empty() {
        errors.push(FieldError {
            field: "phone_number",
            message: "The phone number field is required.".into(),
        });
    }

    let start_date = match NaiveDate::parse_from_str(&payload.start_date, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError {
                field: "start_date",
                message: "The start date is not a valid date.".into(),
            });
            None
        }
    };

    let end_date = match payload.end_date.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.push(FieldError {
                    field: "end_date",
                    message: "The end date is not a valid date.".into(),
                });
                None
            }
        },
        None => None,
    };

    let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
        .bind(payload.property_id)
        .fetch_optional(&state.db)
        .await?;
    if property.is_none() {
        errors.push(FieldError {
            field: "property_id",
            message: "The selected property id is invalid.".into(),
        });
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let property = property.unwrap();
    let start_date = start_date.unwrap();
    let price = total_price(property.price, start_date, end_date);

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (user_id, property_id, start_date, end_date,
                               phone_number, notes, status, total_price)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(auth.user.id)
    .bind(payload.property_id)
    .bind(start_date)
    .bind(end_date)
    .bind(payload.phone_number.trim())
    .bind(&payload.notes)
    .bind(STATUS_PENDING)
    .bind(price)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "status": true,
        "message": "Booking successful!",
        "booking": booking
    })))
}

pub async fn list_my_bookings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let rows = sqlx::query_as::<_, BookingWithProperty>(
        r#"
        SELECT
            b.id, b.user_id, b.property_id, b.start_date, b.end_date,
            b.phone_number, b.notes, b.status, b.total_price, b.created_at,
            p.name as property_name,
            p.location as property_location,
            p.price as property_price,
            p.image_url as property_image_url
        FROM bookings b
        JOIN properties p ON b.property_id = p.id
        WHERE b.user_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(auth.user.id)
    .fetch_all(&state.db)
    .await?;

    let bookings: Vec<Value> = rows.iter().map(booking_with_property_json).collect();
    Ok(Json(json!(bookings)))
}

pub async fn list_all_bookings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Value>, AppError> {
    let rows = sqlx::query_as::<_, BookingWithPropertyAndUser>(
        r#"
        SELECT
            b.id, b.user_id, b.property_id, b.start_date, b.end_date,
            b.phone_number, b.notes, b.status, b.total_price, b.created_at,
            p.name as property_name,
            p.location as property_location,
            p.price as property_price,
            p.image_url as property_image_url,
            u.first_name as user_first_name,
            u.last_name as user_last_name,
            u.email as user_email
        FROM bookings b
        JOIN properties p ON b.property_id = p.id
        JOIN users u ON b.user_id = u.id
        ORDER BY b.created_at DESC
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    let bookings: Vec<Value> = rows
        .iter()
        .map(|row| {
            json!({
                "id": row.id,
                "user_id": row.user_id,
                "property_id": row.property_id,
                "start_date": row.start_date,
                "end_date": row.end_date,
                "phone_number": row.phone_number,
                "notes": row.notes,
                "status": row.status,
                "total_price": row.total_price,
                "created_at": row.created_at,
                "property": {
                    "id": row.property_id,
                    "name": row.property_name,
                    "location": row.property_location,
                    "price": row.property_price,
                    "image_url": row.property_image_url
                },
                "user": {
                    "id": row.user_id,
                    "first_name": row.user_first_name,
                    "last_name": row.user_last_name,
                    "email": row.user_email
                }
            })
        })
        .collect();
    Ok(Json(json!(bookings)))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Value>, AppError> {
    if !is_valid_target_status(&payload.status) {
        return Err(AppError::validation(
            "status",
            "The selected status is invalid.",
        ));
    }

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Booking"))?;

    // Confirmed and cancelled are terminal.
    if is_terminal(&booking.status) {
        return Err(AppError::Conflict(format!(
            "Booking is already {}",
            booking.status
        )));
    }

    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(&payload.status)
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "message": "Booking status updated",
        "data": booking
    })))
}

fn booking_with_property_json(row: &BookingWithProperty) -> Value {
    json!({
        "id": row.id,
        "user_id": row.user_id,
        "property_id": row.property_id,
        "start_date": row.start_date,
        "end_date": row.end_date,
        "phone_number": row.phone_number,
        "notes": row.notes,
        "status": row.status,
        "total_price": row.total_price,
        "created_at": row.created_at,
        "property": {
            "id": row.property_id,
            "name": row.property_name,
            "location": row.property_location,
            "price": row.property_price,
            "image_url": row.property_image_url
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn joined_rows_nest_the_property() {
        let row = BookingWithProperty {
            id: 7,
            user_id: Uuid::new_v4(),
            property_id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            phone_number: "012345678".into(),
            notes: None,
            status: "pending".into(),
            total_price: 500.0,
            created_at: Utc::now(),
            property_name: "Modern Apartment in BKK1".into(),
            property_location: "BKK1, Phnom Penh".into(),
            property_price: 500.0,
            property_image_url: None,
        };

        let value = booking_with_property_json(&row);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["property"]["name"], "Modern Apartment in BKK1");
        assert_eq!(value["property"]["id"], 1);
        assert_eq!(value["total_price"], 500.0);
    }
}

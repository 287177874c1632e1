use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::issue_token;
use crate::error::{AppError, FieldError};
use crate::extract::Json;
use crate::models::user::{LoginRequest, User, ROLE_USER};
use crate::state::AppState;
use crate::storage::extension_for;

#[derive(Debug, Default)]
struct RegisterForm {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    dob: Option<String>,
    address: Option<String>,
    phone_number: Option<String>,
    id_card: Option<(Vec<u8>, &'static str)>,
}

/// JSON body for clients that register without an ID-card photo. Everything
/// is optional here so missing fields surface as field-level validation
/// messages, not a deserialization rejection.
#[derive(Debug, serde::Deserialize)]
pub struct RegisterJsonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub dob: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
}

impl From<RegisterJsonRequest> for RegisterForm {
    fn from(payload: RegisterJsonRequest) -> Self {
        RegisterForm {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password: payload.password,
            dob: payload.dob,
            address: payload.address,
            phone_number: payload.phone_number,
            id_card: None,
        }
    }
}

// The app sends dates as "DD-MM-YYYY"; accept ISO as well.
fn parse_dob(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .ok()
}

fn is_multipart(content_type: &str) -> bool {
    content_type.starts_with("multipart/form-data")
}

async fn collect_register_form(mut multipart: Multipart) -> Result<RegisterForm, AppError> {
    let mut form = RegisterForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("form", e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "id_card" => {
                let ext = extension_for(field.content_type());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation("id_card", e.to_string()))?;
                form.id_card = Some((bytes.to_vec(), ext));
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation("form", e.to_string()))?;
                match name.as_str() {
                    "first_name" => form.first_name = Some(value),
                    "last_name" => form.last_name = Some(value),
                    "email" => form.email = Some(value),
                    "password" => form.password = Some(value),
                    "dob" => form.dob = Some(value),
                    "address" => form.address = Some(value),
                    "phone_number" => form.phone_number = Some(value),
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

// Registration arrives as multipart when the client attaches an ID card and
// as plain JSON otherwise, so the handler branches on the content type.
pub async fn register(
    State(state): State<AppState>,
    req: Request,
) -> Result<Json<Value>, AppError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let form = if is_multipart(&content_type) {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| AppError::validation("form", e.body_text()))?;
        collect_register_form(multipart).await?
    } else {
        let Json(payload) = Json::<RegisterJsonRequest>::from_request(req, &state).await?;
        RegisterForm::from(payload)
    };

    let mut errors: Vec<FieldError> = Vec::new();
    let missing = |value: &Option<String>| value.as_deref().map(str::trim).unwrap_or("").is_empty();

    if missing(&form.first_name) {
        errors.push(FieldError {
            field: "first_name",
            message: "The first name field is required.".into(),
        });
    }
    if missing(&form.last_name) {
        errors.push(FieldError {
            field: "last_name",
            message: "The last name field is required.".into(),
        });
    }
    match form.email.as_deref().map(str::trim) {
        None | Some("") => errors.push(FieldError {
            field: "email",
            message: "The email field is required.".into(),
        }),
        Some(email) if !email.contains('@') => errors.push(FieldError {
            field: "email",
            message: "The email must be a valid email address.".into(),
        }),
        _ => {}
    }
    match form.password.as_deref() {
        None | Some("") => errors.push(FieldError {
            field: "password",
            message: "The password field is required.".into(),
        }),
        Some(p) if p.len() < 6 => errors.push(FieldError {
            field: "password",
            message: "The password must be at least 6 characters.".into(),
        }),
        _ => {}
    }

    let dob = match form.dob.as_deref().filter(|d| !d.is_empty()) {
        Some(raw) => match parse_dob(raw) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError {
                    field: "dob",
                    message: "The dob is not a valid date.".into(),
                });
                None
            }
        },
        None => None,
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let email = form.email.unwrap().trim().to_lowercase();
    let password = form.password.unwrap();

    let taken = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if taken {
        return Err(AppError::validation(
            "email",
            "The email has already been taken.",
        ));
    }

    // Store the ID-card photo before touching the users table so a failed
    // upload never leaves a half-registered account.
    let id_card_path = match form.id_card {
        Some((bytes, ext)) if !bytes.is_empty() => {
            Some(state.storage.store("id_cards", ext, &bytes).await?)
        }
        _ => None,
    };

    let password_hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("bcrypt: {e}")))?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, first_name, last_name, email, password_hash, role,
                            phone_number, address, dob, id_card_path)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(form.first_name.unwrap().trim())
    .bind(form.last_name.unwrap().trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(ROLE_USER)
    .bind(&form.phone_number)
    .bind(&form.address)
    .bind(dob)
    .bind(&id_card_path)
    .fetch_one(&state.db)
    .await?;

    let token = issue_token(&state.db, user.id).await?;

    Ok(Json(json!({
        "status": true,
        "message": "User registered successfully",
        "token": token,
        "user": user
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(payload.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?;

    // Same answer whether the email is unknown or the password is wrong.
    let user = user.ok_or(AppError::InvalidCredentials)?;

    let ok = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("bcrypt: {e}")))?;
    if !ok {
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(&state.db, user.id).await?;

    Ok(Json(json!({
        "status": true,
        "token": token,
        "role": user.role,
        "user": user
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dob_accepts_both_wire_formats() {
        assert_eq!(parse_dob("2000-05-20"), NaiveDate::from_ymd_opt(2000, 5, 20));
        assert_eq!(parse_dob("20-05-2000"), NaiveDate::from_ymd_opt(2000, 5, 20));
        assert_eq!(parse_dob("not-a-date"), None);
    }

    #[test]
    fn registration_dispatches_on_content_type() {
        assert!(is_multipart("multipart/form-data; boundary=xyz"));
        assert!(!is_multipart("application/json"));
        assert!(!is_multipart(""));
    }

    #[test]
    fn json_register_payload_maps_to_the_form() {
        let payload: RegisterJsonRequest = serde_json::from_str(
            r#"{"first_name":"Alice","last_name":"Tan",
                "email":"alice@test.com","password":"secret1"}"#,
        )
        .unwrap();
        let form = RegisterForm::from(payload);

        assert_eq!(form.first_name.as_deref(), Some("Alice"));
        assert_eq!(form.email.as_deref(), Some("alice@test.com"));
        assert_eq!(form.password.as_deref(), Some("secret1"));
        assert!(form.id_card.is_none());
    }

    #[test]
    fn json_register_tolerates_missing_optional_fields() {
        let payload: RegisterJsonRequest = serde_json::from_str(r#"{"email":"a@b.c"}"#).unwrap();
        let form = RegisterForm::from(payload);

        assert!(form.first_name.is_none());
        assert!(form.dob.is_none());
        assert_eq!(form.email.as_deref(), Some("a@b.c"));
    }
}

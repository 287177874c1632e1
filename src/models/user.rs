use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    // Never serialized into a response body
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub dob: Option<NaiveDate>,
    pub id_card_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct UpdateContactRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Chan".into(),
            last_name: "Punleur".into(),
            email: "user@rental.com".into(),
            password_hash: "$2b$12$secret".into(),
            role: role.into(),
            phone_number: None,
            address: None,
            dob: None,
            id_card_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(sample_user(ROLE_USER)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "user@rental.com");
    }

    #[test]
    fn is_admin_checks_role() {
        assert!(sample_user(ROLE_ADMIN).is_admin());
        assert!(!sample_user(ROLE_USER).is_admin());
    }
}

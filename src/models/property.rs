use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub location: String,
    pub description: String,
    pub category: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collected from the multipart form on POST /properties. The image part is
/// handled separately by the upload loop.
#[derive(Debug, Default)]
pub struct CreatePropertyForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub floor_area: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePropertyRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub floor_area: Option<String>,
    pub phone_number: Option<String>,
}

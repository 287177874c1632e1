use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i32,
    pub user_id: Uuid,
    pub property_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub phone_number: String,
    pub notes: Option<String>,
    pub status: String,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking row joined with its property, for GET /bookings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingWithProperty {
    pub id: i32,
    pub user_id: Uuid,
    pub property_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub phone_number: String,
    pub notes: Option<String>,
    pub status: String,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub property_name: String,
    pub property_location: String,
    pub property_price: f64,
    pub property_image_url: Option<String>,
}

/// Booking row joined with property and booker, for GET /admin/bookings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookingWithPropertyAndUser {
    pub id: i32,
    pub user_id: Uuid,
    pub property_id: i32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub phone_number: String,
    pub notes: Option<String>,
    pub status: String,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub property_name: String,
    pub property_location: String,
    pub property_price: f64,
    pub property_image_url: Option<String>,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub property_id: i32,
    pub start_date: String,        // "YYYY-MM-DD"
    pub end_date: Option<String>,  // "YYYY-MM-DD"
    pub phone_number: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

/// Only pending bookings may move, and only to a terminal status.
pub fn is_terminal(status: &str) -> bool {
    status == STATUS_CONFIRMED || status == STATUS_CANCELLED
}

pub fn is_valid_target_status(status: &str) -> bool {
    status == STATUS_CONFIRMED || status == STATUS_CANCELLED
}

/// Number of whole months a stay spans, used for pricing. The span is the
/// ceiling over the date difference with a minimum of one month, so
/// 2024-01-01..2024-02-01 is one month and 2024-01-01..2024-02-15 is two.
pub fn months_spanned(start: NaiveDate, end: Option<NaiveDate>) -> i64 {
    let Some(end) = end else { return 1 };
    if end <= start {
        return 1;
    }

    let mut months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);
    if end.day() > start.day() {
        months += 1;
    }
    months.max(1)
}

pub fn total_price(monthly_price: f64, start: NaiveDate, end: Option<NaiveDate>) -> f64 {
    monthly_price * months_spanned(start, end) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn open_ended_stay_is_one_month() {
        assert_eq!(months_spanned(d("2024-01-01"), None), 1);
    }

    #[test]
    fn exact_month_boundaries() {
        assert_eq!(months_spanned(d("2024-01-01"), Some(d("2024-02-01"))), 1);
        assert_eq!(months_spanned(d("2024-01-15"), Some(d("2024-03-15"))), 2);
    }

    #[test]
    fn partial_months_round_up() {
        assert_eq!(months_spanned(d("2024-01-01"), Some(d("2024-02-15"))), 2);
        assert_eq!(months_spanned(d("2024-01-01"), Some(d("2024-01-10"))), 1);
    }

    #[test]
    fn degenerate_ranges_still_charge_one_month() {
        assert_eq!(months_spanned(d("2024-02-01"), Some(d("2024-02-01"))), 1);
        assert_eq!(months_spanned(d("2024-02-01"), Some(d("2024-01-01"))), 1);
    }

    #[test]
    fn total_price_multiplies_monthly_rate() {
        assert_eq!(total_price(500.0, d("2024-01-01"), Some(d("2024-02-01"))), 500.0);
        assert_eq!(total_price(250.0, d("2024-01-01"), Some(d("2024-04-01"))), 750.0);
        assert_eq!(total_price(1200.0, d("2024-01-01"), None), 1200.0);
    }

    #[test]
    fn only_terminal_targets_are_valid() {
        assert!(is_valid_target_status(STATUS_CONFIRMED));
        assert!(is_valid_target_status(STATUS_CANCELLED));
        assert!(!is_valid_target_status(STATUS_PENDING));
        assert!(!is_valid_target_status("approved"));
    }

    #[test]
    fn terminal_states_are_confirmed_and_cancelled() {
        assert!(is_terminal(STATUS_CONFIRMED));
        assert!(is_terminal(STATUS_CANCELLED));
        assert!(!is_terminal(STATUS_PENDING));
    }
}

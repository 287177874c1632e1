pub mod admin;
pub mod auth;
pub mod booking;
pub mod favorite;
pub mod property;
pub mod user;

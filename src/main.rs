use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod database;
mod error;
mod extract;
mod models;
mod routes;
mod state;
mod storage;

use config::Config;
use routes::admin::stats;
use routes::auth::{login, register};
use routes::booking::{create_booking, list_all_bookings, list_my_bookings, update_booking_status};
use routes::favorite::{list_favorite_ids, list_favorite_properties, toggle_favorite};
use routes::property::{
    create_property, delete_property, get_property, list_properties, update_property,
};
use routes::user::{change_password, get_current_user, update_contact};
use state::AppState;
use storage::DiskStorage;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let pool = database::create_database_connection(&config)
        .await
        .expect("failed to connect to PostgreSQL");

    database::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    database::seed_admin(&pool, &config)
        .await
        .expect("failed to seed admin account");

    let state = AppState {
        db: pool,
        storage: Arc::new(DiskStorage::new(&config.storage_dir)),
    };

    // Allow the mobile app to call from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn handle_404() -> (StatusCode, Json<serde_json::Value>) {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": false, "message": "Not found" })),
        )
    }

    let app = Router::new()
        // Auth
        .route("/register", post(register))
        .route("/login", post(login))
        // Property catalog (public reads, admin writes)
        .route("/home", get(list_properties))
        .route("/properties", get(list_properties).post(create_property))
        .route(
            "/properties/:id",
            get(get_property).put(update_property).delete(delete_property),
        )
        // Current user
        .route("/user", get(get_current_user))
        .route("/user/change-password", post(change_password))
        .route("/user/update-contact", put(update_contact))
        // Bookings
        .route("/bookings", get(list_my_bookings).post(create_booking))
        .route("/bookings/:id", put(update_booking_status))
        .route("/admin/bookings", get(list_all_bookings))
        // Favorites
        .route("/favorites/toggle", post(toggle_favorite))
        .route("/user/favorites", get(list_favorite_ids))
        .route("/favorites", get(list_favorite_properties))
        // Admin dashboard
        .route("/admin/stats", get(stats))
        // Uploaded images
        .nest_service("/storage", ServeDir::new(&config.storage_dir))
        .fallback(handle_404)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
        .with_state(state);

    let addr = config.bind_addr.clone();
    tracing::info!("server running at http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");

    axum::serve(listener, app).await.expect("server error");
}

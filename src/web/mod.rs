use axum::{extract::DefaultBodyLimit, http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::services::TagRepository;
use crate::drive::FileStore;
use crate::server::config::ServerConfig;
use crate::web::error::AppError;
use crate::web::routes::*;

pub mod error;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub tag_repository: Arc<dyn TagRepository>,
    pub file_store: Option<Arc<dyn FileStore>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn file_store(&self) -> Result<Arc<dyn FileStore>, AppError> {
        self.file_store.clone().ok_or_else(|| {
            AppError::ConfigurationMissing(
                "File storage is not configured (set GOOGLE_SERVICE_ACCOUNT_KEY)".to_string(),
            )
        })
    }

    /// Explicit folder, else the configured default.
    pub fn folder_or_default(&self, folder_id: Option<String>) -> Result<String, AppError> {
        folder_id
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .or_else(|| self.config.google_drive_folder_id.clone())
            .ok_or_else(|| AppError::InvalidInput("folderId is required".to_string()))
    }
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let upload_limit = app_state.config.max_upload_bytes;

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/tags", tag_routes::create_tags_router())
        .nest(
            "/api/photos",
            photo_routes::create_photos_router().layer(DefaultBodyLimit::max(upload_limit)),
        )
        .merge(admin_routes::create_admin_router())
        .with_state(app_state)
        .layer(cors)
}

use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;
use tracing::info;

use crate::web::models::InitDbResponse;
use crate::web::{AppError, AppState};

async fn init_db_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<InitDbResponse>, AppError> {
    app_state.tag_repository.init_schema().await?;
    info!("Tag database schema initialized.");
    Ok(Json(InitDbResponse {
        success: true,
        message: "Database initialized successfully".to_string(),
    }))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/init-db", post(init_db_handler))
}

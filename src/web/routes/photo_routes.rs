use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::models::NewTag;
use crate::drive::metadata::PhotoMetadata;
use crate::drive::PhotoUpload;
use crate::search::SearchOrchestrator;
use crate::web::models::{
    required, DeletePhotoRequest, DeletePhotoResponse, FetchPhotosRequest, FetchPhotosResponse, FoldersRequest,
    FoldersResponse, SearchRequest, SearchResponse, SearchResponseStatus, SuccessResponse, UpdateMetadataRequest,
    UploadResponse,
};
use crate::web::{AppError, AppState};

const THUMBNAIL_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

async fn fetch_photos_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<FetchPhotosRequest>,
) -> Result<Json<FetchPhotosResponse>, AppError> {
    let folder_id = app_state.folder_or_default(payload.folder_id)?;
    let store = app_state.file_store()?;
    let page = store.list_photos(&folder_id, payload.page_token.as_deref()).await?;
    info!(folder_id = %folder_id, count = page.photos.len(), "Fetched photos.");
    Ok(Json(FetchPhotosResponse {
        success: true,
        photos: page.photos,
        next_page_token: page.next_page_token,
    }))
}

async fn list_folders_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<FoldersRequest>,
) -> Result<Json<FoldersResponse>, AppError> {
    let folder_id = app_state.folder_or_default(payload.folder_id)?;
    let folders = app_state.file_store()?.list_folders(&folder_id).await?;
    Ok(Json(FoldersResponse { success: true, folders }))
}

async fn search_photos_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let criteria = payload.criteria;
    if criteria.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one search criterion is required".to_string(),
        ));
    }

    if !app_state.tag_repository.is_configured() {
        warn!("Search requested but the tag database is not configured.");
        return Ok(Json(SearchResponse {
            photos: Vec::new(),
            status: SearchResponseStatus::TagStoreUnavailable,
            failed_photo_ids: Vec::new(),
        }));
    }

    let orchestrator = SearchOrchestrator::new(app_state.tag_repository.clone(), app_state.file_store()?);
    let outcome = orchestrator.search(&criteria).await?;
    Ok(Json(SearchResponse {
        photos: outcome.photos,
        status: SearchResponseStatus::Ok,
        failed_photo_ids: outcome.failed_photo_ids,
    }))
}

/// Part content type, else a guess from the file name, else JPEG.
fn upload_mime_type(content_type: Option<&str>, file_name: &str) -> String {
    content_type
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .map(str::to_string)
        .or_else(|| mime_guess::from_path(file_name).first_raw().map(str::to_string))
        .unwrap_or_else(|| "image/jpeg".to_string())
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::InvalidInput(format!("Multipart error: {e}"))
}

async fn upload_photo_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let store = app_state.file_store()?;

    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut folder_id: Option<String> = None;
    let mut metadata_json: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|n| n.to_string()).unwrap_or_default();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("photo.jpg").to_string();
                let content_type = field.content_type().map(|c| c.to_string());
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            "folderId" => folder_id = Some(field.text().await.map_err(multipart_error)?),
            "metadata" => metadata_json = Some(field.text().await.map_err(multipart_error)?),
            other => debug!(field = other, "Ignoring unknown upload field."),
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    let metadata_json = required(metadata_json, "metadata")?;
    let metadata: PhotoMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| AppError::InvalidInput(format!("metadata is not valid JSON: {e}")))?;
    let folder_id = app_state.folder_or_default(folder_id)?;

    let uploaded = store
        .upload_photo(PhotoUpload {
            mime_type: upload_mime_type(content_type.as_deref(), &file_name),
            bytes,
            name: file_name,
            folder_id,
            metadata,
        })
        .await?;

    let tag = NewTag::from(uploaded.metadata.clone());
    let tag_saved = match app_state.tag_repository.add_tag(&uploaded.id, &tag).await {
        Ok(tag_id) => {
            debug!(photo_id = %uploaded.id, tag_id = %tag_id, "Recorded tag for uploaded photo.");
            true
        }
        Err(e) => {
            warn!(photo_id = %uploaded.id, error = %e, "Photo uploaded but its tag was not saved.");
            false
        }
    };

    Ok(Json(UploadResponse {
        success: true,
        file_id: uploaded.id,
        web_view_link: uploaded.web_view_link,
        metadata: uploaded.metadata,
        tag_saved,
    }))
}

async fn delete_photo_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<DeletePhotoRequest>,
) -> Result<Json<DeletePhotoResponse>, AppError> {
    let photo_id = required(payload.photo_id, "photoId")?;
    app_state.file_store()?.delete_photo(&photo_id).await?;

    if !app_state.tag_repository.is_configured() {
        return Ok(Json(DeletePhotoResponse {
            success: true,
            tags_removed: 0,
            inconsistency: None,
        }));
    }

    let response = match app_state.tag_repository.delete_tags_for_photo(&photo_id).await {
        Ok(tags_removed) => DeletePhotoResponse {
            success: true,
            tags_removed,
            inconsistency: None,
        },
        Err(e) => {
            error!(photo_id = %photo_id, error = %e, "Photo deleted but its tags remain in the tag store.");
            DeletePhotoResponse {
                success: true,
                tags_removed: 0,
                inconsistency: Some(format!("Photo deleted but its tags could not be removed: {e}")),
            }
        }
    };
    Ok(Json(response))
}

async fn update_metadata_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateMetadataRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let file_id = required(payload.file_id, "fileId")?;
    let metadata = payload
        .metadata
        .ok_or_else(|| AppError::InvalidInput("metadata is required".to_string()))?;
    app_state
        .file_store()?
        .update_photo_metadata(&file_id, &metadata)
        .await?;
    info!(file_id = %file_id, "Photo metadata updated.");
    Ok(Json(SuccessResponse { success: true }))
}

async fn thumbnail_handler(
    State(app_state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let media = app_state.file_store()?.download(&file_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, media.content_type),
            (header::CACHE_CONTROL, THUMBNAIL_CACHE_CONTROL.to_string()),
        ],
        media.bytes,
    ))
}

pub fn create_photos_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fetch", post(fetch_photos_handler))
        .route("/folders", post(list_folders_handler))
        .route("/search", post(search_photos_handler))
        .route("/upload", post(upload_photo_handler))
        .route("/delete", post(delete_photo_handler))
        .route("/update-metadata", post(update_metadata_handler))
        .route("/thumbnail/{file_id}", get(thumbnail_handler))
}

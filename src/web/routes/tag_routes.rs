use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::db::services::UpdateOutcome;
use crate::web::models::{
    required, AddTagRequest, AddTagResponse, PhotoIdQuery, SuccessResponse, TagIdQuery, TagsResponse,
    UpdateTagRequest, UpdateTagResponse,
};
use crate::web::{AppError, AppState};

async fn get_tags_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PhotoIdQuery>,
) -> Result<Json<TagsResponse>, AppError> {
    let photo_id = required(query.photo_id, "photoId")?;
    let tags = app_state.tag_repository.get_tags(&photo_id).await?;
    Ok(Json(TagsResponse { success: true, tags }))
}

async fn add_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AddTagRequest>,
) -> Result<Json<AddTagResponse>, AppError> {
    let photo_id = required(payload.photo_id, "photoId")?;
    let tag = payload
        .tag
        .ok_or_else(|| AppError::InvalidInput("tag is required".to_string()))?;

    let tag_id = app_state.tag_repository.add_tag(&photo_id, &tag).await?;
    info!(photo_id = %photo_id, tag_id = %tag_id, "Tag added.");
    Ok(Json(AddTagResponse { success: true, tag_id }))
}

async fn update_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<UpdateTagResponse>, AppError> {
    let tag_id = required(payload.tag_id, "tagId")?;
    let outcome = app_state.tag_repository.update_tag(&tag_id, &payload.tag).await?;
    Ok(Json(UpdateTagResponse {
        success: true,
        updated: outcome == UpdateOutcome::Updated,
    }))
}

async fn delete_tag_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TagIdQuery>,
) -> Result<Json<SuccessResponse>, AppError> {
    let tag_id = required(query.tag_id, "tagId")?;
    app_state.tag_repository.delete_tag(&tag_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/",
        get(get_tags_handler)
            .post(add_tag_handler)
            .put(update_tag_handler)
            .delete(delete_tag_handler),
    )
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app_state, get_request, json_request, read_json, sample_metadata, MemoryTagRepository};
    use crate::web::create_axum_router;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn tag_body() -> serde_json::Value {
        serde_json::to_value(crate::db::models::NewTag::from(sample_metadata())).unwrap()
    }

    #[tokio::test]
    async fn test_add_get_update_delete_cycle() {
        let tags = Arc::new(MemoryTagRepository::default());
        let app = create_axum_router(app_state(tags.clone(), None));

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/tags", json!({"photoId": "p1", "tag": tag_body()})))
            .await
            .unwrap();
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        let tag_id = body["tagId"].as_str().unwrap().to_string();
        assert!(tag_id.starts_with("tag_"));

        let response = app.clone().oneshot(get_request("/api/tags?photoId=p1")).await.unwrap();
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tags"][0]["species"], "Wilson's Warbler");
        assert_eq!(body["tags"][0]["id"], tag_id.as_str());

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/api/tags", json!({"tagId": tag_id, "tag": {"notes": "recapture"}})))
            .await
            .unwrap();
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], true);
        assert_eq!(tags.all()[0].notes.as_deref(), Some("recapture"));
        assert_eq!(tags.all()[0].species, "Wilson's Warbler");

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .method("DELETE")
                        .uri(format!("/api/tags?tagId={tag_id}"))
                        .body(axum::body::Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert!(tags.all().is_empty());
    }

    #[tokio::test]
    async fn test_missing_photo_id_is_bad_request() {
        let app = create_axum_router(app_state(Arc::default(), None));
        let (status, body) = read_json(app.oneshot(get_request("/api/tags")).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "photoId is required");
    }

    #[tokio::test]
    async fn test_add_without_tag_is_bad_request() {
        let app = create_axum_router(app_state(Arc::default(), None));
        let response = app
            .oneshot(json_request("POST", "/api/tags", json!({"photoId": "p1"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_unknown_tag_is_not_found_and_empty_patch_is_noop() {
        let tags = Arc::new(MemoryTagRepository::default());
        let app = create_axum_router(app_state(tags, None));

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/api/tags", json!({"tagId": "tag_missing", "tag": {"species": "Robin"}})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(json_request("PUT", "/api/tags", json!({"tagId": "tag_missing", "tag": {}})))
            .await
            .unwrap();
        let (status, body) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], false);
    }

    #[tokio::test]
    async fn test_tag_store_failure_is_server_error() {
        let tags = Arc::new(MemoryTagRepository::default());
        tags.set_failing(true);
        let app = create_axum_router(app_state(tags, None));
        let (status, body) = read_json(app.oneshot(get_request("/api/tags?photoId=p1")).await.unwrap()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("simulated outage"));
    }
}

//! JSON bodies of the `/api` surface. The client backend deserializes the
//! same types, so field names here are the wire contract.

use serde::{Deserialize, Serialize};

use crate::db::models::{FilterCriteria, NewTag, Photo, PhotoTag, TagPatch};
use crate::drive::metadata::PhotoMetadata;
use crate::drive::{FolderEntry, PhotoFile};
use crate::web::error::AppError;

/// Trims `value` and rejects it when absent or blank.
pub fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("{name} is required")))
}

// --- Tags ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoIdQuery {
    pub photo_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagIdQuery {
    pub tag_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTagRequest {
    pub photo_id: Option<String>,
    pub tag: Option<NewTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagRequest {
    pub tag_id: Option<String>,
    #[serde(default)]
    pub tag: TagPatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagsResponse {
    pub success: bool,
    pub tags: Vec<PhotoTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTagResponse {
    pub success: bool,
    pub tag_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTagResponse {
    pub success: bool,
    /// False when the patch carried no fields and nothing was written.
    #[serde(default = "default_true")]
    pub updated: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse {
    pub success: bool,
}

// --- Photos ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchPhotosRequest {
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchPhotosResponse {
    pub success: bool,
    pub photos: Vec<PhotoFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FoldersRequest {
    pub folder_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldersResponse {
    pub success: bool,
    pub folders: Vec<FolderEntry>,
}

/// Serialized wrapped as `{"criteria": {...}}`. Bare criteria objects are
/// accepted on the way in as well.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "SearchBody")]
pub struct SearchRequest {
    pub criteria: FilterCriteria,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchBody {
    Wrapped { criteria: FilterCriteria },
    Bare(FilterCriteria),
}

impl From<SearchBody> for SearchRequest {
    fn from(body: SearchBody) -> Self {
        match body {
            SearchBody::Wrapped { criteria } | SearchBody::Bare(criteria) => Self { criteria },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchResponseStatus {
    Ok,
    TagStoreUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub photos: Vec<Photo>,
    pub status: SearchResponseStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_photo_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub web_view_link: String,
    pub metadata: PhotoMetadata,
    pub tag_saved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhotoRequest {
    pub photo_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhotoResponse {
    pub success: bool,
    pub tags_removed: u64,
    /// Set when the file was deleted but its tags could not be.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inconsistency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetadataRequest {
    pub file_id: Option<String>,
    pub metadata: Option<PhotoMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDbResponse {
    pub success: bool,
    pub message: String,
}

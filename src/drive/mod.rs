use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use self::metadata::PhotoMetadata;

pub mod auth;
pub mod error;
pub mod google;
pub mod metadata;

pub use error::DriveError;

/// A photo object as listed by the file store, with its description decoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub web_view_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub metadata: PhotoMetadata,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhotoPage {
    pub photos: Vec<PhotoFile>,
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct PhotoUpload {
    pub bytes: Bytes,
    pub name: String,
    pub folder_id: String,
    pub mime_type: String,
    pub metadata: PhotoMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedPhoto {
    pub id: String,
    pub web_view_link: String,
    pub metadata: PhotoMetadata,
}

#[derive(Clone, Debug)]
pub struct MediaContent {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Proxied thumbnail route for a file.
pub fn thumbnail_url(file_id: &str) -> String {
    format!("/api/photos/thumbnail/{}", urlencoding::encode(file_id))
}

/// Remote folder of photo objects addressed by opaque file ids.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Non-trashed images directly inside `folder_id`.
    async fn list_photos(&self, folder_id: &str, page_token: Option<&str>) -> Result<PhotoPage, DriveError>;

    /// Non-trashed sub-folders of `folder_id`.
    async fn list_folders(&self, folder_id: &str) -> Result<Vec<FolderEntry>, DriveError>;

    async fn get_photo_metadata(&self, file_id: &str) -> Result<PhotoFile, DriveError>;

    async fn download(&self, file_id: &str) -> Result<MediaContent, DriveError>;

    async fn upload_photo(&self, upload: PhotoUpload) -> Result<UploadedPhoto, DriveError>;

    async fn update_photo_metadata(&self, file_id: &str, metadata: &PhotoMetadata) -> Result<(), DriveError>;

    async fn delete_photo(&self, file_id: &str) -> Result<(), DriveError>;
}

//! In-memory stand-ins for the two remote stores.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::db::error::TagStoreError;
use crate::db::models::{FilterCriteria, NewTag, PhotoTag, TagPatch};
use crate::db::services::{generate_tag_id, now_iso, TagRepository, UpdateOutcome};
use crate::db::sql_http::{Row, SqlExecutor, Statement};
use crate::drive::metadata::{decode_description, encode_description, PhotoMetadata};
use crate::drive::{
    thumbnail_url, DriveError, FileStore, FolderEntry, MediaContent, PhotoFile, PhotoPage, PhotoUpload,
    UploadedPhoto,
};
use crate::server::config::ServerConfig;
use crate::web::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;

pub fn sample_metadata() -> PhotoMetadata {
    PhotoMetadata {
        record_id: "R-1".to_string(),
        band_number: "2811-04452".to_string(),
        date: "2024-05-01".to_string(),
        location: "North Marsh".to_string(),
        species: "Wilson's Warbler".to_string(),
        age: "SY".to_string(),
        sex: "F".to_string(),
        first_photo_number: Some("101".to_string()),
        last_photo_number: Some("104".to_string()),
        wrp_plumage_code: None,
        notes: Some("fat 2".to_string()),
    }
}

pub fn app_state(tags: Arc<MemoryTagRepository>, files: Option<Arc<MemoryFileStore>>) -> Arc<AppState> {
    Arc::new(AppState {
        tag_repository: tags,
        file_store: files.map(|f| f as Arc<dyn FileStore>),
        config: Arc::new(ServerConfig {
            google_drive_folder_id: Some("root-folder".to_string()),
            ..ServerConfig::default()
        }),
    })
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn read_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Records statements and answers each with the same canned rows.
#[derive(Default)]
pub struct RecordingExecutor {
    rows: Vec<Row>,
    sent: Mutex<Vec<Statement>>,
    batches: AtomicUsize,
}

impl RecordingExecutor {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.sent.lock().unwrap().clone()
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn execute_batch(&self, statements: Vec<Statement>) -> Result<Vec<Vec<Row>>, TagStoreError> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        let count = statements.len();
        self.sent.lock().unwrap().extend(statements);
        Ok(vec![self.rows.clone(); count])
    }
}

#[derive(Default)]
pub struct MemoryTagRepository {
    tags: Mutex<Vec<PhotoTag>>,
    failing: AtomicBool,
}

impl MemoryTagRepository {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<PhotoTag> {
        self.tags.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), TagStoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TagStoreError::Query("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TagRepository for MemoryTagRepository {
    fn is_configured(&self) -> bool {
        true
    }

    async fn init_schema(&self) -> Result<(), TagStoreError> {
        self.check()
    }

    async fn get_tags(&self, photo_id: &str) -> Result<Vec<PhotoTag>, TagStoreError> {
        self.check()?;
        let tags = self.tags.lock().unwrap();
        Ok(tags.iter().rev().filter(|t| t.photo_id == photo_id).cloned().collect())
    }

    async fn add_tag(&self, photo_id: &str, tag: &NewTag) -> Result<String, TagStoreError> {
        self.check()?;
        let id = generate_tag_id();
        self.tags
            .lock()
            .unwrap()
            .push(PhotoTag::from_new(id.clone(), photo_id, tag, now_iso()));
        Ok(id)
    }

    async fn update_tag(&self, tag_id: &str, patch: &TagPatch) -> Result<UpdateOutcome, TagStoreError> {
        self.check()?;
        if patch.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }
        let mut tags = self.tags.lock().unwrap();
        let tag = tags
            .iter_mut()
            .find(|t| t.id == tag_id)
            .ok_or_else(|| TagStoreError::NotFound(format!("Tag with id {tag_id} not found")))?;
        patch.apply_to(tag);
        tag.updated_at = Some(now_iso());
        Ok(UpdateOutcome::Updated)
    }

    async fn delete_tag(&self, tag_id: &str) -> Result<(), TagStoreError> {
        self.check()?;
        self.tags.lock().unwrap().retain(|t| t.id != tag_id);
        Ok(())
    }

    async fn delete_tags_for_photo(&self, photo_id: &str) -> Result<u64, TagStoreError> {
        self.check()?;
        let mut tags = self.tags.lock().unwrap();
        let before = tags.len();
        tags.retain(|t| t.photo_id != photo_id);
        Ok((before - tags.len()) as u64)
    }

    async fn search_tags(&self, criteria: &FilterCriteria) -> Result<Vec<PhotoTag>, TagStoreError> {
        self.check()?;
        let tags = self.tags.lock().unwrap();
        Ok(tags.iter().rev().filter(|t| criteria.matches_tag(t)).cloned().collect())
    }
}

struct StoredFile {
    id: String,
    name: String,
    folder_id: String,
    mime_type: String,
    description: String,
    bytes: Bytes,
}

impl StoredFile {
    fn to_photo_file(&self) -> PhotoFile {
        PhotoFile {
            id: self.id.clone(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            image_url: thumbnail_url(&self.id),
            web_view_link: format!("https://drive.example/{}", self.id),
            created_time: Some("2024-05-01T12:00:00.000Z".to_string()),
            modified_time: None,
            metadata: decode_description(Some(&self.description)),
        }
    }
}

/// Stores descriptions as encoded text so reads exercise the real decoder.
#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<Vec<StoredFile>>,
    folders: Mutex<Vec<(String, FolderEntry)>>,
    failing_lookups: Mutex<HashSet<String>>,
    failing_deletes: AtomicBool,
    lookups: AtomicUsize,
    next_id: AtomicUsize,
    /// Zero lists a folder in one page.
    page_size: AtomicUsize,
}

impl MemoryFileStore {
    pub fn insert(&self, id: &str, name: &str, folder_id: &str, metadata: PhotoMetadata) {
        self.files.lock().unwrap().push(StoredFile {
            id: id.to_string(),
            name: name.to_string(),
            folder_id: folder_id.to_string(),
            mime_type: "image/jpeg".to_string(),
            description: encode_description(&metadata),
            bytes: Bytes::from_static(b"\xFF\xD8\xFF"),
        });
    }

    pub fn insert_raw_description(&self, id: &str, folder_id: &str, description: &str) {
        self.insert(id, &format!("{id}.jpg"), folder_id, PhotoMetadata::default());
        if let Some(file) = self.files.lock().unwrap().iter_mut().find(|f| f.id == id) {
            file.description = description.to_string();
        }
    }

    pub fn add_folder(&self, parent_id: &str, id: &str, name: &str) {
        self.folders.lock().unwrap().push((
            parent_id.to_string(),
            FolderEntry {
                id: id.to_string(),
                name: name.to_string(),
            },
        ));
    }

    pub fn fail_lookups_for(&self, id: &str) {
        self.failing_lookups.lock().unwrap().insert(id.to_string());
    }

    pub fn set_failing_deletes(&self, failing: bool) {
        self.failing_deletes.store(failing, Ordering::SeqCst);
    }

    /// Page tokens are the stringified offset of the next page.
    pub fn set_page_size(&self, size: usize) {
        self.page_size.store(size, Ordering::SeqCst);
    }

    pub fn metadata_lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn list_photos(&self, folder_id: &str, page_token: Option<&str>) -> Result<PhotoPage, DriveError> {
        let files = self.files.lock().unwrap();
        let photos: Vec<PhotoFile> = files
            .iter()
            .filter(|f| f.folder_id == folder_id && f.mime_type.starts_with("image/"))
            .map(StoredFile::to_photo_file)
            .collect();
        let page_size = match self.page_size.load(Ordering::SeqCst) {
            0 => photos.len().max(1),
            size => size,
        };
        let start: usize = page_token.map_or(0, |token| token.parse().unwrap());
        let end = (start + page_size).min(photos.len());
        Ok(PhotoPage {
            photos: photos[start.min(end)..end].to_vec(),
            next_page_token: (end < photos.len()).then(|| end.to_string()),
        })
    }

    async fn list_folders(&self, folder_id: &str) -> Result<Vec<FolderEntry>, DriveError> {
        let folders = self.folders.lock().unwrap();
        Ok(folders
            .iter()
            .filter(|(parent, _)| parent == folder_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn get_photo_metadata(&self, file_id: &str) -> Result<PhotoFile, DriveError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_lookups.lock().unwrap().contains(file_id) {
            return Err(DriveError::Api {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        let files = self.files.lock().unwrap();
        files
            .iter()
            .find(|f| f.id == file_id)
            .map(StoredFile::to_photo_file)
            .ok_or_else(|| DriveError::NotFound(format!("file {file_id} not found")))
    }

    async fn download(&self, file_id: &str) -> Result<MediaContent, DriveError> {
        let files = self.files.lock().unwrap();
        files
            .iter()
            .find(|f| f.id == file_id)
            .map(|f| MediaContent {
                bytes: f.bytes.clone(),
                content_type: f.mime_type.clone(),
            })
            .ok_or_else(|| DriveError::NotFound(format!("file {file_id} not found")))
    }

    async fn upload_photo(&self, upload: PhotoUpload) -> Result<UploadedPhoto, DriveError> {
        let id = format!("file_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.files.lock().unwrap().push(StoredFile {
            id: id.clone(),
            name: upload.name,
            folder_id: upload.folder_id,
            mime_type: upload.mime_type,
            description: encode_description(&upload.metadata),
            bytes: upload.bytes,
        });
        Ok(UploadedPhoto {
            web_view_link: format!("https://drive.example/{id}"),
            id,
            metadata: upload.metadata,
        })
    }

    async fn update_photo_metadata(&self, file_id: &str, metadata: &PhotoMetadata) -> Result<(), DriveError> {
        let mut files = self.files.lock().unwrap();
        let file = files
            .iter_mut()
            .find(|f| f.id == file_id)
            .ok_or_else(|| DriveError::NotFound(format!("file {file_id} not found")))?;
        file.description = encode_description(metadata);
        Ok(())
    }

    async fn delete_photo(&self, file_id: &str) -> Result<(), DriveError> {
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(DriveError::Api {
                status: 500,
                body: "simulated outage".to_string(),
            });
        }
        let mut files = self.files.lock().unwrap();
        let before = files.len();
        files.retain(|f| f.id != file_id);
        if files.len() == before {
            return Err(DriveError::NotFound(format!("file {file_id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_metadata_round_trip() {
        let store = MemoryFileStore::default();
        let metadata = sample_metadata();
        let uploaded = store
            .upload_photo(PhotoUpload {
                bytes: Bytes::from_static(b"img"),
                name: "IMG_1.jpg".to_string(),
                folder_id: "folder".to_string(),
                mime_type: "image/jpeg".to_string(),
                metadata: metadata.clone(),
            })
            .await
            .unwrap();

        let fetched = store.get_photo_metadata(&uploaded.id).await.unwrap();
        assert_eq!(fetched.metadata, metadata);
        assert_eq!(fetched.name, "IMG_1.jpg");
    }

    #[tokio::test]
    async fn test_add_then_get_tags_round_trip() {
        let repo = MemoryTagRepository::default();
        let tag = NewTag::from(sample_metadata());
        let id = repo.add_tag("p1", &tag).await.unwrap();

        let tags = repo.get_tags("p1").await.unwrap();
        assert_eq!(tags.len(), 1);
        let stored = &tags[0];
        assert_eq!(stored.id, id);
        assert!(!stored.created_at.is_empty());
        assert_eq!(*stored, PhotoTag::from_new(id.clone(), "p1", &tag, stored.created_at.clone()));
    }
}

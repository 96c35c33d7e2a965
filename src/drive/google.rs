use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::auth::{ServiceAccountKey, TokenProvider};
use super::metadata::{decode_description, encode_description, searchable_properties, PhotoMetadata};
use super::{
    thumbnail_url, DriveError, FileStore, FolderEntry, MediaContent, PhotoFile, PhotoPage, PhotoUpload,
    UploadedPhoto,
};
use crate::server::http::{send_with_retry, RetryPolicy};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const FILE_FIELDS: &str = "id, name, mimeType, description, webViewLink, createdTime, modifiedTime";
const PAGE_SIZE: &str = "100";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    description: Option<String>,
    web_view_link: Option<String>,
    created_time: Option<String>,
    modified_time: Option<String>,
}

impl From<DriveFile> for PhotoFile {
    fn from(file: DriveFile) -> Self {
        let metadata = decode_description(file.description.as_deref());
        PhotoFile {
            image_url: thumbnail_url(&file.id),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            web_view_link: file.web_view_link.unwrap_or_default(),
            created_time: file.created_time,
            modified_time: file.modified_time,
            metadata,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

/// Escapes a value for use inside a single-quoted Drive query literal.
fn quote_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn photos_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and mimeType contains 'image/' and trashed = false",
        quote_query_value(folder_id)
    )
}

pub fn folders_query(folder_id: &str) -> String {
    format!(
        "'{}' in parents and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false",
        quote_query_value(folder_id)
    )
}

fn file_url(file_id: &str) -> String {
    format!("{FILES_URL}/{}", urlencoding::encode(file_id))
}

/// Builds a `multipart/related` media upload body: JSON resource part, then file bytes.
pub fn multipart_related_body(boundary: &str, resource: &serde_json::Value, mime_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
    body.extend_from_slice(resource.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

async fn check_status(response: Response, file_id: Option<&str>) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(DriveError::NotFound(format!(
            "file {} not found",
            file_id.unwrap_or("<unknown>")
        )));
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(DriveError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Google Drive v3 file store authenticated as a service account.
pub struct GoogleDriveStore {
    client: Client,
    tokens: TokenProvider,
    retry: RetryPolicy,
}

impl GoogleDriveStore {
    pub fn new(client: Client, key: ServiceAccountKey, retry: RetryPolicy) -> Result<Self, DriveError> {
        let tokens = TokenProvider::new(key, client.clone())?;
        Ok(Self { client, tokens, retry })
    }

    async fn send<F>(&self, file_id: Option<&str>, build: F) -> Result<Response, DriveError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let token = self.tokens.access_token().await?;
        let response = send_with_retry(self.retry, || build(&self.client, &token)).await?;
        check_status(response, file_id).await
    }

    async fn list(&self, query: String, page_token: Option<&str>) -> Result<FileList, DriveError> {
        let fields = format!("nextPageToken, files({FILE_FIELDS})");
        let response = self
            .send(None, |client, token| {
                let mut params = vec![
                    ("q", query.as_str()),
                    ("spaces", "drive"),
                    ("fields", fields.as_str()),
                    ("pageSize", PAGE_SIZE),
                ];
                if let Some(page_token) = page_token {
                    params.push(("pageToken", page_token));
                }
                client.get(FILES_URL).bearer_auth(token).query(&params)
            })
            .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl FileStore for GoogleDriveStore {
    async fn list_photos(&self, folder_id: &str, page_token: Option<&str>) -> Result<PhotoPage, DriveError> {
        let list = self.list(photos_query(folder_id), page_token).await?;
        debug!(folder_id, count = list.files.len(), has_more = list.next_page_token.is_some(), "Listed photos.");
        Ok(PhotoPage {
            photos: list.files.into_iter().map(PhotoFile::from).collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn list_folders(&self, folder_id: &str) -> Result<Vec<FolderEntry>, DriveError> {
        let mut folders = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let list = self.list(folders_query(folder_id), page_token.as_deref()).await?;
            folders.extend(list.files.into_iter().map(|f| FolderEntry { id: f.id, name: f.name }));
            match list.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }
        Ok(folders)
    }

    async fn get_photo_metadata(&self, file_id: &str) -> Result<PhotoFile, DriveError> {
        let url = file_url(file_id);
        let response = self
            .send(Some(file_id), |client, token| {
                client.get(&url).bearer_auth(token).query(&[("fields", FILE_FIELDS)])
            })
            .await?;
        let file: DriveFile = response.json().await?;
        Ok(file.into())
    }

    async fn download(&self, file_id: &str) -> Result<MediaContent, DriveError> {
        let url = file_url(file_id);
        let response = self
            .send(Some(file_id), |client, token| {
                client.get(&url).bearer_auth(token).query(&[("alt", "media")])
            })
            .await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await?;
        Ok(MediaContent { bytes, content_type })
    }

    async fn upload_photo(&self, upload: PhotoUpload) -> Result<UploadedPhoto, DriveError> {
        let resource = json!({
            "name": upload.name,
            "parents": [upload.folder_id],
            "description": encode_description(&upload.metadata),
            "properties": searchable_properties(&upload.metadata),
        });
        let boundary = format!("photo-upload-{}", uuid::Uuid::new_v4().simple());
        let body = Bytes::from(multipart_related_body(&boundary, &resource, &upload.mime_type, &upload.bytes));
        let content_type = format!("multipart/related; boundary={boundary}");

        let response = self
            .send(None, |client, token| {
                client
                    .post(UPLOAD_URL)
                    .bearer_auth(token)
                    .query(&[("uploadType", "multipart"), ("fields", "id, webViewLink, name")])
                    .header(header::CONTENT_TYPE, content_type.as_str())
                    .body(body.clone())
            })
            .await?;
        let created: CreatedFile = response.json().await?;
        info!(file_id = %created.id, name = %upload.name, folder_id = %upload.folder_id, "Photo uploaded.");

        Ok(UploadedPhoto {
            id: created.id,
            web_view_link: created.web_view_link.unwrap_or_default(),
            metadata: upload.metadata,
        })
    }

    async fn update_photo_metadata(&self, file_id: &str, metadata: &PhotoMetadata) -> Result<(), DriveError> {
        let url = file_url(file_id);
        let resource = json!({
            "description": encode_description(metadata),
            "properties": searchable_properties(metadata),
        });
        self.send(Some(file_id), |client, token| {
            client
                .patch(&url)
                .bearer_auth(token)
                .query(&[("fields", "id")])
                .json(&resource)
        })
        .await?;
        Ok(())
    }

    async fn delete_photo(&self, file_id: &str) -> Result<(), DriveError> {
        let url = file_url(file_id);
        self.send(Some(file_id), |client, token| client.delete(&url).bearer_auth(token))
            .await
            .inspect_err(|e| warn!(file_id, error = %e, "Failed to delete photo."))?;
        info!(file_id, "Photo deleted.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photos_query_escapes_quotes() {
        assert_eq!(
            photos_query("abc'd"),
            "'abc\\'d' in parents and mimeType contains 'image/' and trashed = false"
        );
        assert!(folders_query("root").contains("mimeType = 'application/vnd.google-apps.folder'"));
    }

    #[test]
    fn test_drive_file_decodes_description() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "f1",
            "name": "IMG_0001.jpg",
            "mimeType": "image/jpeg",
            "description": "{\"species\":\"Robin\",\"bandNumber\":\"1\"}",
            "webViewLink": "https://drive.google.com/file/d/f1/view"
        }))
        .unwrap();
        let photo = PhotoFile::from(file);
        assert_eq!(photo.metadata.species, "Robin");
        assert_eq!(photo.image_url, "/api/photos/thumbnail/f1");
        assert_eq!(photo.created_time, None);
    }

    #[test]
    fn test_drive_file_with_plain_description() {
        let file: DriveFile = serde_json::from_value(json!({
            "id": "f2",
            "description": "holiday snap"
        }))
        .unwrap();
        assert_eq!(PhotoFile::from(file).metadata, PhotoMetadata::default());
    }

    #[test]
    fn test_multipart_related_layout() {
        let body = multipart_related_body("b", &json!({"name": "x.jpg"}), "image/jpeg", b"JPEG");
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "--b\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"x.jpg\"}\r\n--b\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n--b--\r\n"
        );
    }
}

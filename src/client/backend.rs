use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::db::models::{FilterCriteria, NewTag, PhotoTag, TagPatch};
use crate::drive::metadata::PhotoMetadata;
use crate::drive::FolderEntry;
use crate::web::models::{
    AddTagRequest, AddTagResponse, DeletePhotoRequest, DeletePhotoResponse, FetchPhotosRequest, FetchPhotosResponse,
    FoldersRequest, FoldersResponse, SearchRequest, SearchResponse, SuccessResponse, TagsResponse,
    UpdateMetadataRequest, UpdateTagRequest, UpdateTagResponse,
};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

/// The server operations the client state store depends on.
#[async_trait]
pub trait PhotoBackend: Send + Sync {
    async fn fetch_photos(
        &self,
        folder_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<FetchPhotosResponse, ClientError>;

    async fn list_folders(&self, folder_id: Option<&str>) -> Result<Vec<FolderEntry>, ClientError>;

    async fn get_tags(&self, photo_id: &str) -> Result<Vec<PhotoTag>, ClientError>;

    async fn add_tag(&self, photo_id: &str, tag: &NewTag) -> Result<String, ClientError>;

    async fn update_tag(&self, tag_id: &str, patch: &TagPatch) -> Result<(), ClientError>;

    async fn delete_tag(&self, tag_id: &str) -> Result<(), ClientError>;

    async fn search(&self, criteria: &FilterCriteria) -> Result<SearchResponse, ClientError>;

    async fn delete_photo(&self, photo_id: &str) -> Result<DeletePhotoResponse, ClientError>;

    async fn update_photo_metadata(&self, file_id: &str, metadata: &PhotoMetadata) -> Result<(), ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// `PhotoBackend` over the `/api` HTTP surface.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        decode_response(response).await
    }

    async fn post<B: serde::Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        debug!(path, "POST");
        self.send(self.client.post(self.url(path)).json(body)).await
    }
}

#[async_trait]
impl PhotoBackend for HttpBackend {
    async fn fetch_photos(
        &self,
        folder_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<FetchPhotosResponse, ClientError> {
        let body = FetchPhotosRequest {
            folder_id: folder_id.map(str::to_string),
            page_token: page_token.map(str::to_string),
        };
        self.post("/photos/fetch", &body).await
    }

    async fn list_folders(&self, folder_id: Option<&str>) -> Result<Vec<FolderEntry>, ClientError> {
        let body = FoldersRequest {
            folder_id: folder_id.map(str::to_string),
        };
        let response: FoldersResponse = self.post("/photos/folders", &body).await?;
        Ok(response.folders)
    }

    async fn get_tags(&self, photo_id: &str) -> Result<Vec<PhotoTag>, ClientError> {
        let request = self.client.get(self.url("/tags")).query(&[("photoId", photo_id)]);
        let response: TagsResponse = self.send(request).await?;
        Ok(response.tags)
    }

    async fn add_tag(&self, photo_id: &str, tag: &NewTag) -> Result<String, ClientError> {
        let body = AddTagRequest {
            photo_id: Some(photo_id.to_string()),
            tag: Some(tag.clone()),
        };
        let response: AddTagResponse = self.post("/tags", &body).await?;
        Ok(response.tag_id)
    }

    async fn update_tag(&self, tag_id: &str, patch: &TagPatch) -> Result<(), ClientError> {
        let body = UpdateTagRequest {
            tag_id: Some(tag_id.to_string()),
            tag: patch.clone(),
        };
        let _: UpdateTagResponse = self.send(self.client.put(self.url("/tags")).json(&body)).await?;
        Ok(())
    }

    async fn delete_tag(&self, tag_id: &str) -> Result<(), ClientError> {
        let request = self.client.delete(self.url("/tags")).query(&[("tagId", tag_id)]);
        let _: SuccessResponse = self.send(request).await?;
        Ok(())
    }

    async fn search(&self, criteria: &FilterCriteria) -> Result<SearchResponse, ClientError> {
        let body = SearchRequest {
            criteria: criteria.clone(),
        };
        self.post("/photos/search", &body).await
    }

    async fn delete_photo(&self, photo_id: &str) -> Result<DeletePhotoResponse, ClientError> {
        let body = DeletePhotoRequest {
            photo_id: Some(photo_id.to_string()),
        };
        self.post("/photos/delete", &body).await
    }

    async fn update_photo_metadata(&self, file_id: &str, metadata: &PhotoMetadata) -> Result<(), ClientError> {
        let body = UpdateMetadataRequest {
            file_id: Some(file_id.to_string()),
            metadata: Some(metadata.clone()),
        };
        let _: SuccessResponse = self.post("/photos/update-metadata", &body).await?;
        Ok(())
    }
}

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{ClientError, PhotoBackend};
use super::state::{reduce, Action, Breadcrumb, PhotoState, SearchStatus};
use crate::db::models::{FilterCriteria, NewTag, Photo, PhotoTag, TagPatch};
use crate::db::services::now_iso;
use crate::drive::metadata::PhotoMetadata;
use crate::drive::FolderEntry;
use crate::search::{filter_locally, select_mode, SearchMode};
use crate::web::models::SearchResponseStatus;

/// Whether a tag mutation reached the tag store. The local change is kept either way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    LocalOnly { reason: String },
}

/// Owns the client state and runs commands against a backend.
///
/// Tag mutations are applied locally first and then sent; a failed send leaves
/// the local mutation in place and reports `SyncStatus::LocalOnly`. Photo
/// deletion is the exception and only changes local state after the server
/// confirms it.
pub struct PhotoStore {
    backend: Arc<dyn PhotoBackend>,
    state: PhotoState,
    server_search: bool,
}

impl PhotoStore {
    pub fn new(backend: Arc<dyn PhotoBackend>) -> Self {
        Self {
            backend,
            state: PhotoState::default(),
            server_search: true,
        }
    }

    pub fn state(&self) -> &PhotoState {
        &self.state
    }

    /// With server search off, active criteria filter the resident photos only.
    pub fn set_server_search(&mut self, enabled: bool) {
        self.server_search = enabled;
    }

    pub fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    pub fn set_photos(&mut self, photos: Vec<Photo>) {
        self.dispatch(Action::SetPhotos(photos));
    }

    pub fn add_photo(&mut self, photo: Photo) {
        self.dispatch(Action::AddPhoto(photo));
    }

    pub fn update_photo(&mut self, photo: Photo) {
        self.dispatch(Action::UpdatePhoto(photo));
    }

    pub fn select_photo(&mut self, photo_id: Option<&str>) {
        self.dispatch(Action::SelectPhoto(photo_id.map(str::to_string)));
    }

    pub fn clear_filters(&mut self) {
        self.dispatch(Action::ClearFilters);
    }

    /// One page of a folder's photos with their tags attached.
    async fn fetch_page(
        &self,
        folder_id: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<(Vec<Photo>, Option<String>), ClientError> {
        let page = self.backend.fetch_photos(folder_id, page_token).await?;
        let backend = &self.backend;
        let loads = page.photos.into_iter().map(|file| async move {
            let tags = backend.get_tags(&file.id).await.unwrap_or_else(|e| {
                warn!(photo_id = %file.id, error = %e, "Failed to load tags, showing photo untagged.");
                Vec::new()
            });
            Photo::from_file(file, tags)
        });
        let photos: Vec<Photo> = join_all(loads).await.into_iter().filter(Photo::is_image).collect();
        Ok((photos, page.next_page_token))
    }

    /// Loads a folder's photos with their tags and replaces the photo list.
    /// Returns the next-page cursor if the folder has more photos.
    pub async fn load_folder(&mut self, folder_id: Option<&str>) -> Result<Option<String>, ClientError> {
        let (photos, next_page_token) = self.fetch_page(folder_id, None).await?;
        info!(count = photos.len(), "Loaded folder.");
        self.dispatch(Action::SetPhotos(photos));
        Ok(next_page_token)
    }

    /// Appends the page at `page_token` of the current folder. Returns the
    /// cursor after it, if any.
    pub async fn load_more(&mut self, page_token: &str) -> Result<Option<String>, ClientError> {
        let folder_id = self.state.current_folder_id.clone();
        let (photos, next_page_token) = self.fetch_page(folder_id.as_deref(), Some(page_token)).await?;
        debug!(count = photos.len(), "Loaded further photos.");
        self.dispatch(Action::AppendPhotos(photos));
        Ok(next_page_token)
    }

    pub async fn list_folders(&self, folder_id: Option<&str>) -> Result<Vec<FolderEntry>, ClientError> {
        self.backend.list_folders(folder_id).await
    }

    pub async fn open_root(&mut self, root: Breadcrumb) -> Result<Option<String>, ClientError> {
        let folder_id = root.id.clone();
        self.dispatch(Action::ResetNavigation(root));
        self.load_folder(Some(&folder_id)).await
    }

    pub async fn enter_folder(&mut self, folder: FolderEntry) -> Result<Option<String>, ClientError> {
        let folder_id = folder.id.clone();
        self.dispatch(Action::EnterFolder(Breadcrumb {
            id: folder.id,
            name: folder.name,
        }));
        self.load_folder(Some(&folder_id)).await
    }

    pub async fn navigate_to_breadcrumb(&mut self, index: usize) -> Result<Option<String>, ClientError> {
        self.dispatch(Action::NavigateToBreadcrumb(index));
        let folder_id = self.state.current_folder_id.clone();
        self.load_folder(folder_id.as_deref()).await
    }

    /// Replaces one photo's tags. On failure the state is left as it was.
    pub async fn load_photo_tags(&mut self, photo_id: &str) -> Result<(), ClientError> {
        let tags = self.backend.get_tags(photo_id).await?;
        debug!(photo_id, count = tags.len(), "Loaded tags.");
        self.dispatch(Action::SetPhotoTags {
            photo_id: photo_id.to_string(),
            tags,
        });
        Ok(())
    }

    pub async fn add_tag(&mut self, photo_id: &str, tag: NewTag) -> SyncStatus {
        let provisional_id = format!("local_{}", Uuid::new_v4().simple());
        self.dispatch(Action::AddTag {
            photo_id: photo_id.to_string(),
            tag: PhotoTag::from_new(provisional_id.clone(), photo_id, &tag, now_iso()),
        });

        match self.backend.add_tag(photo_id, &tag).await {
            Ok(tag_id) => {
                self.dispatch(Action::TagIdAssigned { provisional_id, tag_id });
                SyncStatus::Synced
            }
            Err(e) => {
                warn!(photo_id, error = %e, "Tag kept locally, add failed on server.");
                SyncStatus::LocalOnly { reason: e.to_string() }
            }
        }
    }

    pub async fn update_tag(&mut self, tag_id: &str, patch: TagPatch) -> SyncStatus {
        self.dispatch(Action::UpdateTag {
            tag_id: tag_id.to_string(),
            patch: patch.clone(),
            updated_at: now_iso(),
        });

        match self.backend.update_tag(tag_id, &patch).await {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                warn!(tag_id, error = %e, "Tag change kept locally, update failed on server.");
                SyncStatus::LocalOnly { reason: e.to_string() }
            }
        }
    }

    pub async fn delete_tag(&mut self, tag_id: &str) -> SyncStatus {
        self.dispatch(Action::DeleteTag {
            tag_id: tag_id.to_string(),
        });

        match self.backend.delete_tag(tag_id).await {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                warn!(tag_id, error = %e, "Tag removed locally, delete failed on server.");
                SyncStatus::LocalOnly { reason: e.to_string() }
            }
        }
    }

    /// Replaces the displayed list with the photos matching `criteria`.
    /// The full photo list is never changed.
    pub async fn search_photos(&mut self, criteria: FilterCriteria) -> SearchStatus {
        self.dispatch(Action::SetFilters(criteria.clone()));

        let (photos, status) = match select_mode(&criteria, self.server_search) {
            SearchMode::Unfiltered => return SearchStatus::Unfiltered,
            SearchMode::Local => {
                let photos = filter_locally(&self.state.photos, &criteria);
                let status = if photos.is_empty() {
                    SearchStatus::NoMatches
                } else {
                    SearchStatus::Results
                };
                (photos, status)
            }
            SearchMode::Server => match self.backend.search(&criteria).await {
                Ok(response) if response.status == SearchResponseStatus::Ok => {
                    if !response.failed_photo_ids.is_empty() {
                        warn!(failed = ?response.failed_photo_ids, "Some matching photos could not be loaded.");
                    }
                    let status = if response.photos.is_empty() {
                        SearchStatus::NoMatches
                    } else {
                        SearchStatus::Results
                    };
                    (response.photos, status)
                }
                Ok(_) => {
                    warn!("Tag store unavailable, filtering loaded photos instead.");
                    (filter_locally(&self.state.photos, &criteria), SearchStatus::LocalFallback)
                }
                Err(e) => {
                    warn!(error = %e, "Search failed, filtering loaded photos instead.");
                    (filter_locally(&self.state.photos, &criteria), SearchStatus::LocalFallback)
                }
            },
        };

        self.dispatch(Action::ShowSearchResults { photos, status });
        status
    }

    /// Deletes on the server first; local state changes only on success.
    /// Returns the server's inconsistency note when the file went but its tags stayed.
    pub async fn delete_photo(&mut self, photo_id: &str) -> Result<Option<String>, ClientError> {
        let response = self.backend.delete_photo(photo_id).await?;
        if let Some(note) = &response.inconsistency {
            warn!(photo_id, note = %note, "Photo deleted with leftover tags.");
        }
        self.dispatch(Action::RemovePhoto(photo_id.to_string()));
        Ok(response.inconsistency)
    }

    pub async fn save_photo_metadata(&self, photo_id: &str, metadata: &PhotoMetadata) -> Result<(), ClientError> {
        self.backend.update_photo_metadata(photo_id, metadata).await
    }
}

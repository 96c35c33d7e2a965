//! Resolving filter criteria into a set of photos with their matching tags.
//!
//! Criteria can name tags on photos that were never loaded from the current
//! folder, so an active search always goes to the tag store. Local filtering
//! over resident photos is only used when that store cannot be reached.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::error::TagStoreError;
use crate::db::models::{FilterCriteria, Photo, PhotoTag};
use crate::db::services::TagRepository;
use crate::drive::FileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// No active criteria: show the full resident list.
    Unfiltered,
    /// Substring filter over photos already in memory.
    Local,
    /// Tag-store query followed by a file-store lookup per matched photo.
    Server,
}

pub fn select_mode(criteria: &FilterCriteria, server_available: bool) -> SearchMode {
    if criteria.is_empty() {
        SearchMode::Unfiltered
    } else if server_available {
        SearchMode::Server
    } else {
        SearchMode::Local
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub photos: Vec<Photo>,
    /// Photos whose tags matched but whose file-store lookup failed.
    pub failed_photo_ids: Vec<String>,
}

impl SearchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failed_photo_ids.is_empty()
    }
}

/// Distinct owning photo ids in order of first appearance.
pub fn distinct_photo_ids(tags: &[PhotoTag]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|tag| seen.insert(tag.photo_id.as_str()))
        .map(|tag| tag.photo_id.clone())
        .collect()
}

/// Photos with at least one tag matching every active field. Order is preserved.
pub fn filter_locally(photos: &[Photo], criteria: &FilterCriteria) -> Vec<Photo> {
    if criteria.is_empty() {
        return photos.to_vec();
    }
    photos
        .iter()
        .filter(|photo| photo.tags.iter().any(|tag| criteria.matches_tag(tag)))
        .cloned()
        .collect()
}

pub struct SearchOrchestrator {
    tags: Arc<dyn TagRepository>,
    files: Arc<dyn FileStore>,
}

impl SearchOrchestrator {
    pub fn new(tags: Arc<dyn TagRepository>, files: Arc<dyn FileStore>) -> Self {
        Self { tags, files }
    }

    /// Server-side search. A failed photo lookup drops that photo and is
    /// reported in `failed_photo_ids`; it never fails the whole search.
    /// Empty criteria touch neither store and give an empty outcome.
    pub async fn search(&self, criteria: &FilterCriteria) -> Result<SearchOutcome, TagStoreError> {
        if criteria.is_empty() {
            debug!("Search called without criteria.");
            return Ok(SearchOutcome::default());
        }
        let matched = self.tags.search_tags(criteria).await?;
        info!(matched_tags = matched.len(), "Tag search finished.");

        if matched.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let photo_ids = distinct_photo_ids(&matched);
        debug!(photos = photo_ids.len(), "Resolving matched photos.");

        let lookups = photo_ids.iter().map(|photo_id| async move {
            (photo_id, self.files.get_photo_metadata(photo_id).await)
        });

        let mut outcome = SearchOutcome::default();
        for (photo_id, result) in join_all(lookups).await {
            match result {
                Ok(file) => {
                    let photo_tags = matched
                        .iter()
                        .filter(|tag| &tag.photo_id == photo_id)
                        .cloned()
                        .collect();
                    outcome.photos.push(Photo::from_file(file, photo_tags));
                }
                Err(e) => {
                    warn!(photo_id = %photo_id, error = %e, "Dropping photo from search results.");
                    outcome.failed_photo_ids.push(photo_id.clone());
                }
            }
        }

        if outcome.is_partial() {
            warn!(
                failed = outcome.failed_photo_ids.len(),
                returned = outcome.photos.len(),
                "Search completed with partial batch failure."
            );
        }
        Ok(outcome)
    }
}

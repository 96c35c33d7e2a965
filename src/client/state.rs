use crate::db::models::{FilterCriteria, Photo, PhotoTag, TagPatch};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
}

/// What the displayed list currently represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStatus {
    #[default]
    Unfiltered,
    Results,
    NoMatches,
    /// Server search could not run; the display is a local filter of resident photos.
    LocalFallback,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhotoState {
    pub photos: Vec<Photo>,
    pub filtered_photos: Vec<Photo>,
    pub filters: FilterCriteria,
    pub selected_photo_id: Option<String>,
    pub current_folder_id: Option<String>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub search_status: SearchStatus,
}

impl PhotoState {
    pub fn selected_photo(&self) -> Option<&Photo> {
        let id = self.selected_photo_id.as_deref()?;
        self.find_photo(id)
    }

    pub fn find_photo(&self, photo_id: &str) -> Option<&Photo> {
        self.photos
            .iter()
            .chain(self.filtered_photos.iter())
            .find(|p| p.id == photo_id)
    }

    pub fn find_tag(&self, tag_id: &str) -> Option<&PhotoTag> {
        self.photos
            .iter()
            .chain(self.filtered_photos.iter())
            .flat_map(|p| p.tags.iter())
            .find(|t| t.id == tag_id)
    }

    fn knows_photo(&self, photo_id: &str) -> bool {
        self.find_photo(photo_id).is_some()
    }

    fn clear_dangling_selection(&mut self) {
        if let Some(id) = self.selected_photo_id.as_deref() {
            if !self.knows_photo(id) {
                self.selected_photo_id = None;
            }
        }
    }

    /// Applies `f` to every copy of the photo, in both the full and displayed lists.
    fn for_each_photo_mut(&mut self, photo_id: &str, mut f: impl FnMut(&mut Photo)) {
        for photo in self.photos.iter_mut().chain(self.filtered_photos.iter_mut()) {
            if photo.id == photo_id {
                f(photo);
            }
        }
    }

    fn for_each_tag_mut(&mut self, tag_id: &str, mut f: impl FnMut(&mut PhotoTag)) {
        for photo in self.photos.iter_mut().chain(self.filtered_photos.iter_mut()) {
            for tag in photo.tags.iter_mut().filter(|t| t.id == tag_id) {
                f(tag);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Replaces the full and displayed lists together and drops active filters.
    SetPhotos(Vec<Photo>),
    /// Appends a further page of the current folder, skipping photos already held.
    AppendPhotos(Vec<Photo>),
    AddPhoto(Photo),
    UpdatePhoto(Photo),
    RemovePhoto(String),
    SetFilters(FilterCriteria),
    ShowSearchResults { photos: Vec<Photo>, status: SearchStatus },
    ClearFilters,
    SelectPhoto(Option<String>),
    SetPhotoTags { photo_id: String, tags: Vec<PhotoTag> },
    AddTag { photo_id: String, tag: PhotoTag },
    /// Swaps a provisional local tag id for the id the store assigned.
    TagIdAssigned { provisional_id: String, tag_id: String },
    UpdateTag { tag_id: String, patch: TagPatch, updated_at: String },
    DeleteTag { tag_id: String },
    ResetNavigation(Breadcrumb),
    EnterFolder(Breadcrumb),
    NavigateToBreadcrumb(usize),
}

pub fn reduce(mut state: PhotoState, action: Action) -> PhotoState {
    match action {
        Action::SetPhotos(photos) => {
            state.filtered_photos = photos.clone();
            state.photos = photos;
            state.filters = FilterCriteria::default();
            state.search_status = SearchStatus::Unfiltered;
            state.clear_dangling_selection();
        }
        Action::AppendPhotos(photos) => {
            let fresh: Vec<Photo> = photos
                .into_iter()
                .filter(|p| !state.photos.iter().any(|held| held.id == p.id))
                .collect();
            if state.filters.is_empty() {
                state.filtered_photos.extend(fresh.iter().cloned());
            }
            state.photos.extend(fresh);
        }
        Action::AddPhoto(photo) => {
            if state.filters.is_empty() {
                state.filtered_photos.insert(0, photo.clone());
            }
            state.photos.insert(0, photo);
        }
        Action::UpdatePhoto(photo) => {
            let id = photo.id.clone();
            state.for_each_photo_mut(&id, |p| *p = photo.clone());
        }
        Action::RemovePhoto(photo_id) => {
            state.photos.retain(|p| p.id != photo_id);
            state.filtered_photos.retain(|p| p.id != photo_id);
            state.clear_dangling_selection();
        }
        Action::SetFilters(criteria) => {
            if criteria.is_empty() {
                state.filtered_photos = state.photos.clone();
                state.search_status = SearchStatus::Unfiltered;
            }
            state.filters = criteria;
        }
        Action::ShowSearchResults { photos, status } => {
            state.filtered_photos = photos;
            state.search_status = status;
            state.clear_dangling_selection();
        }
        Action::ClearFilters => {
            state.filters = FilterCriteria::default();
            state.filtered_photos = state.photos.clone();
            state.search_status = SearchStatus::Unfiltered;
            state.clear_dangling_selection();
        }
        Action::SelectPhoto(photo_id) => {
            let selected = photo_id.filter(|id| state.knows_photo(id));
            state.selected_photo_id = selected;
        }
        Action::SetPhotoTags { photo_id, tags } => {
            state.for_each_photo_mut(&photo_id, |p| p.tags = tags.clone());
        }
        Action::AddTag { photo_id, tag } => {
            state.for_each_photo_mut(&photo_id, |p| p.tags.insert(0, tag.clone()));
        }
        Action::TagIdAssigned { provisional_id, tag_id } => {
            state.for_each_tag_mut(&provisional_id, |t| t.id = tag_id.clone());
        }
        Action::UpdateTag { tag_id, patch, updated_at } => {
            if !patch.is_empty() {
                state.for_each_tag_mut(&tag_id, |t| {
                    patch.apply_to(t);
                    t.updated_at = Some(updated_at.clone());
                });
            }
        }
        Action::DeleteTag { tag_id } => {
            for photo in state.photos.iter_mut().chain(state.filtered_photos.iter_mut()) {
                photo.tags.retain(|t| t.id != tag_id);
            }
        }
        Action::ResetNavigation(root) => {
            state.current_folder_id = Some(root.id.clone());
            state.breadcrumbs = vec![root];
            state.selected_photo_id = None;
        }
        Action::EnterFolder(crumb) => {
            state.current_folder_id = Some(crumb.id.clone());
            state.breadcrumbs.push(crumb);
            state.selected_photo_id = None;
        }
        Action::NavigateToBreadcrumb(index) => {
            if let Some(crumb) = state.breadcrumbs.get(index) {
                state.current_folder_id = Some(crumb.id.clone());
                state.breadcrumbs.truncate(index + 1);
                state.selected_photo_id = None;
            }
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::NewTag;

    fn photo(id: &str) -> Photo {
        Photo {
            id: id.to_string(),
            google_drive_id: id.to_string(),
            name: format!("{id}.jpg"),
            mime_type: "image/jpeg".to_string(),
            image_url: String::new(),
            web_view_link: String::new(),
            created_time: None,
            modified_time: None,
            tags: Vec::new(),
            created_at: String::new(),
        }
    }

    fn tag(id: &str, photo_id: &str, species: &str) -> PhotoTag {
        let new = NewTag {
            species: species.to_string(),
            ..NewTag::default()
        };
        PhotoTag::from_new(id.to_string(), photo_id, &new, "2024-05-01T00:00:00.000Z".to_string())
    }

    fn crumb(id: &str) -> Breadcrumb {
        Breadcrumb {
            id: id.to_string(),
            name: id.to_uppercase(),
        }
    }

    fn loaded() -> PhotoState {
        reduce(PhotoState::default(), Action::SetPhotos(vec![photo("a"), photo("b"), photo("c")]))
    }

    #[test]
    fn test_set_photos_replaces_both_lists() {
        let state = loaded();
        assert_eq!(state.photos, state.filtered_photos);
        assert_eq!(state.photos.len(), 3);
        assert_eq!(state.search_status, SearchStatus::Unfiltered);
    }

    #[test]
    fn test_append_photos_skips_held_and_respects_filters() {
        let state = reduce(loaded(), Action::AppendPhotos(vec![photo("c"), photo("d")]));
        let ids: Vec<&str> = state.photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(state.filtered_photos, state.photos);

        let filtered = reduce(
            state,
            Action::SetFilters(FilterCriteria {
                species: Some("Robin".into()),
                ..Default::default()
            }),
        );
        let shown = filtered.filtered_photos.len();
        let state = reduce(filtered, Action::AppendPhotos(vec![photo("e")]));
        assert_eq!(state.photos.len(), 5);
        assert_eq!(state.filtered_photos.len(), shown);
    }

    #[test]
    fn test_selecting_unknown_photo_clears_selection() {
        let state = reduce(loaded(), Action::SelectPhoto(Some("b".into())));
        assert_eq!(state.selected_photo().map(|p| p.id.as_str()), Some("b"));

        let state = reduce(state, Action::SelectPhoto(Some("zzz".into())));
        assert_eq!(state.selected_photo_id, None);
    }

    #[test]
    fn test_removing_selected_photo_clears_selection() {
        let state = reduce(loaded(), Action::SelectPhoto(Some("b".into())));
        let state = reduce(state, Action::RemovePhoto("b".into()));
        assert_eq!(state.selected_photo_id, None);
        assert!(state.find_photo("b").is_none());

        let state = reduce(state, Action::SelectPhoto(Some("a".into())));
        let state = reduce(state, Action::SetPhotos(vec![photo("c")]));
        assert_eq!(state.selected_photo_id, None);
    }

    #[test]
    fn test_tag_mutations_touch_only_the_owner_in_both_lists() {
        let mut state = loaded();
        state.filtered_photos = vec![photo("b")];

        let state = reduce(state, Action::AddTag { photo_id: "b".into(), tag: tag("t1", "b", "Robin") });
        let state = reduce(state, Action::AddTag { photo_id: "b".into(), tag: tag("t2", "b", "Sparrow") });
        assert_eq!(state.photos[1].tags.len(), 2);
        assert_eq!(state.photos[1].tags[0].id, "t2");
        assert_eq!(state.filtered_photos[0].tags.len(), 2);
        assert!(state.photos[0].tags.is_empty());

        let state = reduce(state, Action::TagIdAssigned { provisional_id: "t1".into(), tag_id: "tag_9".into() });
        assert!(state.find_tag("tag_9").is_some());
        assert!(state.find_tag("t1").is_none());

        let patch = TagPatch {
            species: Some("American Robin".into()),
            ..Default::default()
        };
        let state = reduce(
            state,
            Action::UpdateTag { tag_id: "tag_9".into(), patch, updated_at: "later".into() },
        );
        let updated = state.find_tag("tag_9").unwrap();
        assert_eq!(updated.species, "American Robin");
        assert_eq!(updated.updated_at.as_deref(), Some("later"));
        assert_eq!(state.filtered_photos[0].tags[1].species, "American Robin");

        let state = reduce(state, Action::DeleteTag { tag_id: "t2".into() });
        assert_eq!(state.photos[1].tags.len(), 1);
        assert_eq!(state.filtered_photos[0].tags.len(), 1);
    }

    #[test]
    fn test_empty_patch_does_not_bump_updated_at() {
        let state = reduce(loaded(), Action::AddTag { photo_id: "a".into(), tag: tag("t1", "a", "Robin") });
        let state = reduce(
            state,
            Action::UpdateTag { tag_id: "t1".into(), patch: TagPatch::default(), updated_at: "later".into() },
        );
        assert_eq!(state.find_tag("t1").unwrap().updated_at, None);
    }

    #[test]
    fn test_set_photo_tags_leaves_other_photos_alone() {
        let state = reduce(loaded(), Action::AddTag { photo_id: "a".into(), tag: tag("t1", "a", "Robin") });
        let state = reduce(
            state,
            Action::SetPhotoTags { photo_id: "c".into(), tags: vec![tag("t5", "c", "Heron")] },
        );
        assert_eq!(state.photos[0].tags[0].id, "t1");
        assert_eq!(state.photos[2].tags[0].id, "t5");
        assert!(state.photos[1].tags.is_empty());
    }

    #[test]
    fn test_search_results_never_touch_full_list() {
        let criteria = FilterCriteria {
            species: Some("Robin".into()),
            ..Default::default()
        };
        let state = reduce(loaded(), Action::SetFilters(criteria));
        let state = reduce(
            state,
            Action::ShowSearchResults { photos: vec![photo("x")], status: SearchStatus::Results },
        );
        assert_eq!(state.photos.len(), 3);
        assert_eq!(state.filtered_photos, vec![photo("x")]);

        let state = reduce(state, Action::SelectPhoto(Some("x".into())));
        assert_eq!(state.selected_photo_id.as_deref(), Some("x"));

        let state = reduce(state, Action::ClearFilters);
        assert_eq!(state.filtered_photos, state.photos);
        assert_eq!(state.search_status, SearchStatus::Unfiltered);
        assert_eq!(state.selected_photo_id, None);
    }

    #[test]
    fn test_add_photo_shows_only_when_unfiltered() {
        let state = reduce(loaded(), Action::AddPhoto(photo("new")));
        assert_eq!(state.photos[0].id, "new");
        assert_eq!(state.filtered_photos[0].id, "new");

        let criteria = FilterCriteria {
            species: Some("Robin".into()),
            ..Default::default()
        };
        let state = reduce(state, Action::SetFilters(criteria));
        let state = reduce(state, Action::AddPhoto(photo("newer")));
        assert_eq!(state.photos[0].id, "newer");
        assert_ne!(state.filtered_photos[0].id, "newer");
    }

    #[test]
    fn test_breadcrumb_navigation() {
        let state = reduce(PhotoState::default(), Action::ResetNavigation(crumb("root")));
        let state = reduce(state, Action::EnterFolder(crumb("2024")));
        let state = reduce(state, Action::EnterFolder(crumb("may")));
        assert_eq!(state.breadcrumbs.len(), 3);
        assert_eq!(state.current_folder_id.as_deref(), Some("may"));

        let state = reduce(state, Action::NavigateToBreadcrumb(0));
        assert_eq!(state.breadcrumbs, vec![crumb("root")]);
        assert_eq!(state.current_folder_id.as_deref(), Some("root"));

        let unchanged = reduce(state.clone(), Action::NavigateToBreadcrumb(7));
        assert_eq!(unchanged, state);
    }
}

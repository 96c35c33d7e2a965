use serde::{Deserialize, Serialize};

use crate::drive::metadata::PhotoMetadata;
use crate::db::services::now_iso;
use crate::drive::PhotoFile;

/// A tag row as stored in `photo_tags`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoTag {
    pub id: String,
    #[serde(default)]
    pub photo_id: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub band_number: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_photo_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_photo_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrp_plumage_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PhotoTag {
    pub fn from_new(id: String, photo_id: &str, tag: &NewTag, created_at: String) -> Self {
        Self {
            id,
            photo_id: photo_id.to_string(),
            record_id: tag.record_id.clone(),
            band_number: tag.band_number.clone(),
            date: tag.date.clone(),
            location: tag.location.clone(),
            species: tag.species.clone(),
            age: tag.age.clone(),
            sex: tag.sex.clone(),
            first_photo_number: tag.first_photo_number.clone(),
            last_photo_number: tag.last_photo_number.clone(),
            wrp_plumage_code: tag.wrp_plumage_code.clone(),
            notes: tag.notes.clone(),
            created_at,
            updated_at: None,
        }
    }

    pub fn field(&self, field: TagField) -> &str {
        match field {
            TagField::RecordId => &self.record_id,
            TagField::BandNumber => &self.band_number,
            TagField::Date => &self.date,
            TagField::Location => &self.location,
            TagField::Species => &self.species,
            TagField::Age => &self.age,
            TagField::Sex => &self.sex,
            TagField::Notes => self.notes.as_deref().unwrap_or(""),
        }
    }
}

/// Tag contents supplied at creation; the store assigns `id` and `createdAt`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTag {
    pub record_id: String,
    pub band_number: String,
    pub date: String,
    pub location: String,
    pub species: String,
    pub age: String,
    pub sex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_photo_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_photo_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrp_plumage_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<PhotoMetadata> for NewTag {
    fn from(metadata: PhotoMetadata) -> Self {
        Self {
            record_id: metadata.record_id,
            band_number: metadata.band_number,
            date: metadata.date,
            location: metadata.location,
            species: metadata.species,
            age: metadata.age,
            sex: metadata.sex,
            first_photo_number: metadata.first_photo_number,
            last_photo_number: metadata.last_photo_number,
            wrp_plumage_code: metadata.wrp_plumage_code,
            notes: metadata.notes,
        }
    }
}

/// Sparse update for a tag. `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_photo_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_photo_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrp_plumage_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TagPatch {
    /// Column/value pairs for every field present in the patch, in table column order.
    pub fn assignments(&self) -> Vec<(&'static str, &str)> {
        [
            ("recordId", &self.record_id),
            ("bandNumber", &self.band_number),
            ("date", &self.date),
            ("location", &self.location),
            ("species", &self.species),
            ("age", &self.age),
            ("sex", &self.sex),
            ("firstPhotoNumber", &self.first_photo_number),
            ("lastPhotoNumber", &self.last_photo_number),
            ("wrpPlumageCode", &self.wrp_plumage_code),
            ("notes", &self.notes),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.as_deref().map(|v| (column, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    pub fn apply_to(&self, tag: &mut PhotoTag) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                target.clone_from(v);
            }
        }
        fn set_opt(target: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }
        set(&mut tag.record_id, &self.record_id);
        set(&mut tag.band_number, &self.band_number);
        set(&mut tag.date, &self.date);
        set(&mut tag.location, &self.location);
        set(&mut tag.species, &self.species);
        set(&mut tag.age, &self.age);
        set(&mut tag.sex, &self.sex);
        set_opt(&mut tag.first_photo_number, &self.first_photo_number);
        set_opt(&mut tag.last_photo_number, &self.last_photo_number);
        set_opt(&mut tag.wrp_plumage_code, &self.wrp_plumage_code);
        set_opt(&mut tag.notes, &self.notes);
    }
}

/// The tag attributes that can be searched on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagField {
    RecordId,
    BandNumber,
    Date,
    Location,
    Species,
    Age,
    Sex,
    Notes,
}

impl TagField {
    pub fn column(self) -> &'static str {
        match self {
            TagField::RecordId => "recordId",
            TagField::BandNumber => "bandNumber",
            TagField::Date => "date",
            TagField::Location => "location",
            TagField::Species => "species",
            TagField::Age => "age",
            TagField::Sex => "sex",
            TagField::Notes => "notes",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FilterCriteria {
    /// Supplied, non-blank constraints.
    pub fn active_fields(&self) -> Vec<(TagField, &str)> {
        [
            (TagField::RecordId, &self.record_id),
            (TagField::BandNumber, &self.band_number),
            (TagField::Date, &self.date),
            (TagField::Location, &self.location),
            (TagField::Species, &self.species),
            (TagField::Age, &self.age),
            (TagField::Sex, &self.sex),
            (TagField::Notes, &self.notes),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (field, v))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active_fields().is_empty()
    }

    /// Substring match on every active field, ASCII case-insensitive like SQLite `LIKE`.
    pub fn matches_tag(&self, tag: &PhotoTag) -> bool {
        self.active_fields()
            .into_iter()
            .all(|(field, pattern)| contains_ignore_ascii_case(tag.field(field), pattern))
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// A file-store photo together with whatever tags have been loaded for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub google_drive_id: String,
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
    pub tags: Vec<PhotoTag>,
    #[serde(default)]
    pub created_at: String,
}

impl Photo {
    pub fn from_file(file: PhotoFile, tags: Vec<PhotoTag>) -> Self {
        let created_at = file
            .created_time
            .clone()
            .unwrap_or_else(now_iso);
        Self {
            google_drive_id: file.id.clone(),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            image_url: file.image_url,
            web_view_link: file.web_view_link,
            created_time: file.created_time,
            modified_time: file.modified_time,
            tags,
            created_at,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.is_empty() || self.mime_type.starts_with("image/")
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Structured fields mirrored into a file's free-text description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhotoMetadata {
    pub record_id: String,
    pub band_number: String,
    pub date: String,
    pub location: String,
    pub species: String,
    pub age: String,
    pub sex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_photo_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_photo_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrp_plumage_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Canonical JSON text stored in the description attribute.
pub fn encode_description(metadata: &PhotoMetadata) -> String {
    // A struct of strings always serializes.
    serde_json::to_string(metadata).unwrap_or_default()
}

/// Never fails: absent or unparseable descriptions decode to the empty structure.
pub fn decode_description(description: Option<&str>) -> PhotoMetadata {
    let Some(text) = description.filter(|d| !d.trim().is_empty()) else {
        return PhotoMetadata::default();
    };
    serde_json::from_str(text).unwrap_or_else(|e| {
        warn!(error = %e, "File description is not photo metadata, using empty metadata.");
        PhotoMetadata::default()
    })
}

/// Required fields as provider-side queryable properties.
pub fn searchable_properties(metadata: &PhotoMetadata) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("recordId", metadata.record_id.clone()),
        ("bandNumber", metadata.band_number.clone()),
        ("species", metadata.species.clone()),
        ("location", metadata.location.clone()),
        ("date", metadata.date.clone()),
        ("age", metadata.age.clone()),
        ("sex", metadata.sex.clone()),
    ])
}
